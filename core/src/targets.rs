pub const API: &str = "printdash::api";
pub const POLLING: &str = "printdash::polling";
pub const UI: &str = "printdash::ui";
pub const CONFIG: &str = "printdash::config";

pub const ALL: [&str; 4] = [API, POLLING, UI, CONFIG];
