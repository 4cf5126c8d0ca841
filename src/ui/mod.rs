pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, muted, section, status, success, timing, warn};
pub use table::{languages_table, LanguageRow};
pub use theme::{theme, Theme};
