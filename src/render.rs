use crate::config::RenderOptions;
use crate::convert::{ConvertError, MarkdownConverter};
use std::fmt::{Display, Formatter};

const DOCUMENT_SHELL: &str = include_str!("assets/shell.html");

/// A complete, self-contained styled document: stylesheet, content region,
/// and the embedded update-listener script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for RenderedDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RenderedDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Converts `markdown` and assembles the full styled document. Deterministic
/// for identical inputs.
pub fn render<C>(
    markdown: &str,
    options: &RenderOptions,
    converter: &C,
) -> Result<RenderedDocument, ConvertError>
where
    C: MarkdownConverter + ?Sized,
{
    let fragment = converter.convert(markdown)?;
    Ok(RenderedDocument(assemble(&fragment, options)))
}

fn assemble(fragment: &str, options: &RenderOptions) -> String {
    let palette = options.theme.palette();

    // Content is substituted last so fragment text can never collide with a
    // style placeholder.
    DOCUMENT_SHELL
        .replace("__FONT_SIZE__", &options.font_size)
        .replace("__FONT_FAMILY__", &options.font_family)
        .replace("__LINE_HEIGHT__", &options.line_height)
        .replace("__MAX_WIDTH__", &options.max_width)
        .replace("__BACKGROUND__", palette.background)
        .replace("__TEXT__", palette.text)
        .replace("__HEADING__", palette.heading)
        .replace("__LINK_HOVER__", palette.link_hover)
        .replace("__LINK__", palette.link)
        .replace("__CODE_BACKGROUND__", palette.code_background)
        .replace("__CODE_TEXT__", palette.code_text)
        .replace("__QUOTE_BORDER__", palette.quote_border)
        .replace("__QUOTE_BACKGROUND__", palette.quote_background)
        .replace("__RULE__", palette.rule)
        .replace("__ACCENT__", palette.accent)
        .replace("__CONTENT__", fragment)
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::config::RenderOptions;
    use crate::convert::CmarkConverter;
    use crate::theme::Theme;

    fn options_with_theme(theme: Theme) -> RenderOptions {
        RenderOptions {
            theme,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn embeds_every_palette_color_for_each_theme() {
        let converter = CmarkConverter::default();

        for theme in Theme::all() {
            let document =
                render("# sample", &options_with_theme(theme), &converter).expect("render");

            for color in theme.palette().colors() {
                assert!(
                    document.as_str().contains(color),
                    "theme {} missing color {color}",
                    theme.name()
                );
            }
        }
    }

    #[test]
    fn rendering_is_pure() {
        let converter = CmarkConverter::default();
        let options = options_with_theme(Theme::Cool);
        let markdown = "# Title\n\nbody text with *emphasis*";

        let first = render(markdown, &options, &converter).expect("render");
        let second = render(markdown, &options, &converter).expect("render");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_markdown_yields_empty_content_container() {
        let converter = CmarkConverter::default();
        let document = render("", &RenderOptions::default(), &converter).expect("render");

        assert!(document.as_str().contains("<div id=\"content\"></div>"));
    }

    #[test]
    fn embeds_layout_options_in_stylesheet() {
        let converter = CmarkConverter::default();
        let options = RenderOptions {
            max_width: String::from("720px"),
            font_size: String::from("16px"),
            font_family: String::from("Palatino, serif"),
            theme: Theme::Paper,
            line_height: String::from("1.6"),
        };

        let document = render("text", &options, &converter).expect("render");
        let html = document.as_str();

        assert!(html.contains("max-width: 720px;"));
        assert!(html.contains("font-size: 16px;"));
        assert!(html.contains("font-family: Palatino, serif;"));
        assert!(html.contains("line-height: 1.6;"));
    }

    #[test]
    fn leaves_no_unsubstituted_placeholders() {
        let converter = CmarkConverter::default();
        let document = render("# check", &RenderOptions::default(), &converter).expect("render");

        assert!(!document.as_str().contains("__"));
    }

    #[test]
    fn embeds_update_listener_script() {
        let converter = CmarkConverter::default();
        let document = render("# check", &RenderOptions::default(), &converter).expect("render");

        assert!(document.as_str().contains("new EventSource('/events')"));
    }

    #[test]
    fn dark_theme_heading_scenario() {
        let converter = CmarkConverter::default();
        let options = RenderOptions {
            max_width: String::from("680px"),
            font_size: String::from("18px"),
            font_family: String::from("serif"),
            theme: Theme::Dark,
            line_height: String::from("1.8"),
        };

        let document = render("# Hello", &options, &converter).expect("render");
        let html = document.as_str();

        assert!(html.contains("color: #f5f5f5;"));
        assert!(html.contains("<h1>Hello</h1>"));
    }

    #[test]
    fn unknown_theme_matches_warm_output() {
        let converter = CmarkConverter::default();
        let markdown = "# fallback";

        let unknown = RenderOptions {
            theme: Theme::resolve("no-such-theme"),
            ..RenderOptions::default()
        };
        let warm = options_with_theme(Theme::Warm);

        let from_unknown = render(markdown, &unknown, &converter).expect("render");
        let from_warm = render(markdown, &warm, &converter).expect("render");
        assert_eq!(from_unknown, from_warm);
    }

    #[test]
    fn markdown_resembling_placeholders_is_not_substituted() {
        let converter = CmarkConverter::default();
        let document = render(
            "literal `__ACCENT__` stays put",
            &RenderOptions::default(),
            &converter,
        )
        .expect("render");

        assert!(document.as_str().contains("<code>__ACCENT__</code>"));
    }
}
