//! Card template registry.
//!
//! Four built-in looks plus user-defined ones. Lookup never fails:
//! unknown names fall back to `classic`, so a stale template name in the
//! config file degrades instead of breaking card generation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::record::ShareRecord;

pub const DEFAULT_TEMPLATE: &str = "classic";

/// Style parameters consumed by the card renderer. Colors are `#rrggbb`
/// strings so templates survive the JSON import/export round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStyle {
    pub background: String,
    /// Two-stop top-to-bottom gradient; `None` paints `background` flat.
    pub background_gradient: Option<[String; 2]>,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub text: String,
    pub text_secondary: String,
    pub text_muted: String,
    pub corner_radius: u32,
    pub shadow: bool,
}

/// Partial style for deriving a custom template: `None` keeps the base
/// template's value (shallow merge, field by field).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StyleOverrides {
    pub background: Option<String>,
    pub background_gradient: Option<[String; 2]>,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub accent: Option<String>,
    pub text: Option<String>,
    pub text_secondary: Option<String>,
    pub text_muted: Option<String>,
    pub corner_radius: Option<u32>,
    pub shadow: Option<bool>,
}

impl StyleOverrides {
    fn apply(self, base: &TemplateStyle) -> TemplateStyle {
        TemplateStyle {
            background: self.background.unwrap_or_else(|| base.background.clone()),
            background_gradient: self.background_gradient.or_else(|| base.background_gradient.clone()),
            primary: self.primary.unwrap_or_else(|| base.primary.clone()),
            secondary: self.secondary.unwrap_or_else(|| base.secondary.clone()),
            accent: self.accent.unwrap_or_else(|| base.accent.clone()),
            text: self.text.unwrap_or_else(|| base.text.clone()),
            text_secondary: self.text_secondary.unwrap_or_else(|| base.text_secondary.clone()),
            text_muted: self.text_muted.unwrap_or_else(|| base.text_muted.clone()),
            corner_radius: self.corner_radius.unwrap_or(base.corner_radius),
            shadow: self.shadow.unwrap_or(base.shadow),
        }
    }
}

/// How a template decorates the record before rendering. A closed enum
/// rather than a boxed closure: annotators must survive registry cloning
/// and cannot round-trip through JSON anyway, so imported templates get
/// `Identity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotator {
    Classic,
    Modern,
    Minimal,
    Colorful,
    /// Pass-through, used for imported and custom templates.
    Identity,
}

impl Annotator {
    fn customizations(self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        match self {
            Annotator::Classic | Annotator::Identity => {}
            Annotator::Modern => {
                map.insert("use_gradient".into(), "true".into());
                map.insert("gradient_direction".into(), "diagonal".into());
            }
            Annotator::Minimal => {
                map.insert("show_border".into(), "true".into());
                map.insert("show_shadow".into(), "false".into());
            }
            Annotator::Colorful => {
                map.insert("show_decorations".into(), "true".into());
            }
        }
        map
    }
}

/// Listing entry for template pickers: identity plus the colors that
/// give the preview swatch its look.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplatePreview {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

/// Record plus the template metadata it was rendered under.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedRecord {
    pub record: ShareRecord,
    pub template: String,
    pub customizations: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct Template {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub style: TemplateStyle,
    pub annotator: Annotator,
}

/// Descriptive fields + style, the part of a template that serializes.
#[derive(Serialize, Deserialize)]
pub struct TemplateExport {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "classic_style")]
    pub style: TemplateStyle,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown template \"{0}\"")]
    Unknown(String),
    #[error("template JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid color \"{value}\" for {field}")]
    BadColor { field: &'static str, value: String },
}

/// Reject styles whose color fields would not parse at render time.
fn validate_style(style: &TemplateStyle) -> Result<(), TemplateError> {
    let fields: [(&'static str, &str); 7] = [
        ("background", &style.background),
        ("primary", &style.primary),
        ("secondary", &style.secondary),
        ("accent", &style.accent),
        ("text", &style.text),
        ("text_secondary", &style.text_secondary),
        ("text_muted", &style.text_muted),
    ];
    for (field, value) in fields {
        if super::surface::Color::from_hex(value).is_none() {
            return Err(TemplateError::BadColor { field, value: value.to_string() });
        }
    }
    if let Some([top, bottom]) = &style.background_gradient {
        for (field, value) in [("gradient top", top.as_str()), ("gradient bottom", bottom)] {
            if super::surface::Color::from_hex(value).is_none() {
                return Err(TemplateError::BadColor { field, value: value.to_string() });
            }
        }
    }
    Ok(())
}

pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
    /// Counter for naming custom/imported templates within a session.
    derived: u32,
}

impl TemplateRegistry {
    pub fn new() -> TemplateRegistry {
        let mut reg = TemplateRegistry { templates: HashMap::new(), derived: 0 };
        reg.register(classic_template());
        reg.register(modern_template());
        reg.register(minimal_template());
        reg.register(colorful_template());
        reg
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Lookup with fallback to `classic`. Never fails: the built-in
    /// default is always registered.
    pub fn get(&self, name: &str) -> &Template {
        self.templates.get(name).unwrap_or_else(|| {
            if name != DEFAULT_TEMPLATE {
                warn!(name, "unknown template, falling back to {DEFAULT_TEMPLATE}");
            }
            &self.templates[DEFAULT_TEMPLATE]
        })
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Picker entries for every registered template, sorted by name.
    pub fn previews(&self) -> Vec<TemplatePreview> {
        self.names()
            .into_iter()
            .map(|name| {
                let t = &self.templates[&name];
                TemplatePreview {
                    name,
                    display_name: t.display_name.clone(),
                    description: t.description.clone(),
                    primary: t.style.primary.clone(),
                    secondary: t.style.secondary.clone(),
                    accent: t.style.accent.clone(),
                }
            })
            .collect()
    }

    /// Apply a template's annotator to a record.
    pub fn render(&self, name: &str, record: &ShareRecord) -> AnnotatedRecord {
        let template = self.get(name);
        AnnotatedRecord {
            record: record.clone(),
            template: template.name.clone(),
            customizations: template.annotator.customizations(),
        }
    }

    /// Derive and register a custom template from a base by shallow
    /// merge. The base resolves with the usual classic fallback.
    pub fn create_custom(&mut self, base: &str, overrides: StyleOverrides) -> &Template {
        let style = overrides.apply(&self.get(base).style);
        self.derived += 1;
        let name = format!("custom-{}", self.derived);
        self.register(Template {
            name: name.clone(),
            display_name: "Custom template".into(),
            description: format!("Derived from \"{base}\""),
            style,
            annotator: Annotator::Identity,
        });
        &self.templates[&name]
    }

    /// Serialize a template's descriptive fields and style as JSON.
    /// The annotator does not serialize.
    pub fn export(&self, name: &str) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        let export = TemplateExport {
            name: template.name.clone(),
            display_name: template.display_name.clone(),
            description: template.description.clone(),
            style: template.style.clone(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Register a template from exported JSON. The style's colors are
    /// validated up front; imported templates get the identity annotator.
    pub fn import(&mut self, json: &str) -> Result<&Template, TemplateError> {
        let export: TemplateExport = serde_json::from_str(json)?;
        validate_style(&export.style)?;
        let name = if export.name.is_empty() {
            self.derived += 1;
            format!("imported-{}", self.derived)
        } else {
            export.name
        };
        self.register(Template {
            name: name.clone(),
            display_name: export.display_name,
            description: export.description,
            style: export.style,
            annotator: Annotator::Identity,
        });
        Ok(&self.templates[&name])
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        TemplateRegistry::new()
    }
}

// ── Built-in templates ──

fn classic_style() -> TemplateStyle {
    TemplateStyle {
        background: "#ffffff".into(),
        background_gradient: Some(["#f8fafc".into(), "#e2e8f0".into()]),
        primary: "#667eea".into(),
        secondary: "#764ba2".into(),
        accent: "#10b981".into(),
        text: "#1f2937".into(),
        text_secondary: "#6b7280".into(),
        text_muted: "#94a3b8".into(),
        corner_radius: 12,
        shadow: true,
    }
}

fn classic_template() -> Template {
    Template {
        name: "classic".into(),
        display_name: "Classic".into(),
        description: "Traditional look, suited to formal contexts".into(),
        style: classic_style(),
        annotator: Annotator::Classic,
    }
}

fn modern_template() -> Template {
    Template {
        name: "modern".into(),
        display_name: "Modern".into(),
        description: "Gradient background, high energy".into(),
        style: TemplateStyle {
            background: "#f0f4ff".into(),
            background_gradient: Some(["#8b5cf6".into(), "#ec4899".into()]),
            primary: "#8b5cf6".into(),
            secondary: "#ec4899".into(),
            accent: "#f59e0b".into(),
            text: "#1f2937".into(),
            text_secondary: "#4b5563".into(),
            text_muted: "#94a3b8".into(),
            corner_radius: 20,
            shadow: true,
        },
        annotator: Annotator::Modern,
    }
}

fn minimal_template() -> Template {
    Template {
        name: "minimal".into(),
        display_name: "Minimal".into(),
        description: "Plain monochrome, content first".into(),
        style: TemplateStyle {
            background: "#ffffff".into(),
            background_gradient: None,
            primary: "#000000".into(),
            secondary: "#666666".into(),
            accent: "#000000".into(),
            text: "#000000".into(),
            text_secondary: "#666666".into(),
            text_muted: "#999999".into(),
            corner_radius: 0,
            shadow: false,
        },
        annotator: Annotator::Minimal,
    }
}

fn colorful_template() -> Template {
    Template {
        name: "colorful".into(),
        display_name: "Colorful".into(),
        description: "Bright and playful".into(),
        style: TemplateStyle {
            background: "#fef3c7".into(),
            background_gradient: None,
            primary: "#f59e0b".into(),
            secondary: "#ef4444".into(),
            accent: "#10b981".into(),
            text: "#1f2937".into(),
            text_secondary: "#6b7280".into(),
            text_muted: "#94a3b8".into(),
            corner_radius: 16,
            shadow: true,
        },
        annotator: Annotator::Colorful,
    }
}
