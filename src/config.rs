use crate::theme::Theme;

/// Key-value source for render options. Values are read once per render and
/// never cached between renders.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub max_width: String,
    pub font_size: String,
    pub font_family: String,
    pub theme: Theme,
    pub line_height: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_width: String::from("680px"),
            font_size: String::from("18px"),
            font_family: String::from("Georgia, 'Times New Roman', serif"),
            theme: Theme::Warm,
            line_height: String::from("1.8"),
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &impl ConfigSource) -> Self {
        let defaults = Self::default();

        Self {
            max_width: get_first(config, &["max_width", "maxWidth"]).unwrap_or(defaults.max_width),
            font_size: get_first(config, &["font_size", "fontSize"]).unwrap_or(defaults.font_size),
            font_family: get_first(config, &["font_family", "fontFamily"])
                .unwrap_or(defaults.font_family),
            theme: get_first(config, &["theme", "themeName"])
                .map(|name| Theme::resolve(&name))
                .unwrap_or(defaults.theme),
            line_height: get_first(config, &["line_height", "lineHeight"])
                .unwrap_or(defaults.line_height),
        }
    }
}

fn get_first(config: &impl ConfigSource, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = config.get(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    None
}

/// Reads options from prefixed environment variables, e.g. the `max_width`
/// key becomes `PRETTYMD_MAX_WIDTH`. camelCase aliases normalize to the same
/// variable.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable_name(&self, key: &str) -> String {
        let mut name = String::with_capacity(self.prefix.len() + key.len() + 4);
        name.push_str(&self.prefix);
        name.push('_');

        for ch in key.chars() {
            if ch.is_ascii_uppercase() {
                name.push('_');
                name.push(ch);
            } else {
                name.push(ch.to_ascii_uppercase());
            }
        }

        name
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new("PRETTYMD")
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}
