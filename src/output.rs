use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `ASTLENS_QUIET=1` suppresses decorative status lines; results still print
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("ASTLENS_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
