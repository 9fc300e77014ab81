use std::sync::OnceLock;

pub mod contract;
pub mod controller;
pub mod provider;
pub mod wallet;
pub mod util {
    pub mod serde_helpers;
    pub mod tonlib_helpers;
}

pub static BIN_VERSION: &str = env!("JETTON_ICO_VERSION");

pub fn version_string() -> &'static str {
    static STRING: OnceLock<String> = OnceLock::new();
    STRING.get_or_init(|| format!("(release {BIN_VERSION})"))
}
