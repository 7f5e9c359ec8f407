/// Named color set applied to the generated stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub heading: &'static str,
    pub link: &'static str,
    pub link_hover: &'static str,
    pub code_background: &'static str,
    pub code_text: &'static str,
    pub quote_border: &'static str,
    pub quote_background: &'static str,
    pub rule: &'static str,
    pub accent: &'static str,
}

impl Palette {
    pub fn colors(&self) -> [&'static str; 11] {
        [
            self.background,
            self.text,
            self.heading,
            self.link,
            self.link_hover,
            self.code_background,
            self.code_text,
            self.quote_border,
            self.quote_background,
            self.rule,
            self.accent,
        ]
    }
}

const WARM: Palette = Palette {
    background: "#faf8f3",
    text: "#2c2416",
    heading: "#1a1410",
    link: "#b8634a",
    link_hover: "#8b4532",
    code_background: "#f0ede4",
    code_text: "#5c4d3d",
    quote_border: "#d4b896",
    quote_background: "#f5f2ea",
    rule: "#e8dfc8",
    accent: "#b8634a",
};

const COOL: Palette = Palette {
    background: "#f8fafb",
    text: "#1e293b",
    heading: "#0f172a",
    link: "#3b82f6",
    link_hover: "#2563eb",
    code_background: "#f1f5f9",
    code_text: "#475569",
    quote_border: "#94a3b8",
    quote_background: "#f8fafc",
    rule: "#e2e8f0",
    accent: "#3b82f6",
};

const DARK: Palette = Palette {
    background: "#1a1a1a",
    text: "#e4e4e4",
    heading: "#f5f5f5",
    link: "#f0c674",
    link_hover: "#ffd98a",
    code_background: "#2a2a2a",
    code_text: "#b5bd68",
    quote_border: "#555555",
    quote_background: "#222222",
    rule: "#404040",
    accent: "#f0c674",
};

const PAPER: Palette = Palette {
    background: "#ffffff",
    text: "#1a1a1a",
    heading: "#000000",
    link: "#0066cc",
    link_hover: "#0052a3",
    code_background: "#f6f6f6",
    code_text: "#333333",
    quote_border: "#d0d0d0",
    quote_background: "#fafafa",
    rule: "#e0e0e0",
    accent: "#0066cc",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Warm,
    Cool,
    Dark,
    Paper,
}

impl Theme {
    /// Unknown or empty names resolve to [`Theme::Warm`]; this is policy, not
    /// an error.
    pub fn resolve(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "cool" => Self::Cool,
            "dark" => Self::Dark,
            "paper" => Self::Paper,
            _ => Self::Warm,
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Self::Warm => &WARM,
            Self::Cool => &COOL,
            Self::Dark => &DARK,
            Self::Paper => &PAPER,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Warm => "warm",
            Self::Cool => "cool",
            Self::Dark => "dark",
            Self::Paper => "paper",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Warm, Self::Cool, Self::Dark, Self::Paper]
    }
}
