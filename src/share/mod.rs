pub mod card;
pub mod dispatch;
pub mod font;
pub mod record;
pub mod surface;
pub mod templates;
