use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Light,
    Dark,
    #[serde(rename = "Solarized Light")]
    SolarizedLight,
    #[serde(rename = "Solarized Dark")]
    SolarizedDark,
}

impl Theme {
    pub const ALL: [Theme; 4] = [
        Theme::Light,
        Theme::Dark,
        Theme::SolarizedLight,
        Theme::SolarizedDark,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::SolarizedLight => "Solarized Light",
            Theme::SolarizedDark => "Solarized Dark",
        }
    }

    /// Matches the display name, ignoring case.
    pub fn from_name(name: &str) -> Option<Theme> {
        let name = name.trim();
        Theme::ALL
            .into_iter()
            .find(|theme| theme.name().eq_ignore_ascii_case(name))
    }

    /// (window, text) colours.
    fn palette(self) -> (&'static str, &'static str) {
        match self {
            Theme::Light => ("#FFFFFF", "#000000"),
            Theme::Dark => ("#000000", "#FFFFFF"),
            Theme::SolarizedLight => ("#FDF6E3", "#657B83"),
            Theme::SolarizedDark => ("#073642", "#839496"),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::SolarizedLight
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a tab needs to style its editor and preview surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayStyle {
    pub theme: Theme,
    pub background: &'static str,
    pub foreground: &'static str,
    pub font_family: String,
    pub font_size: u16,
}

pub fn display_style(theme: Theme, font_family: &str, font_size: u16) -> DisplayStyle {
    let (background, foreground) = theme.palette();
    DisplayStyle {
        theme,
        background,
        foreground,
        font_family: font_family.to_string(),
        font_size,
    }
}

impl DisplayStyle {
    /// Wraps rendered markup into the full preview page.
    pub fn compose_page(&self, markup: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
body {{
    background-color: {bg};
    color: {fg};
    font-family: '{family}';
    font-size: {size}pt;
    padding: 20px;
    overflow-y: scroll;
}}
pre, code {{
    tab-size: 4;
}}
pre {{
    padding: 10px;
    border-radius: 5px;
    overflow: auto;
}}
code {{
    padding: 2px 4px;
    border-radius: 3px;
}}
</style>
</head>
<body>
{markup}
</body>
</html>
"#,
            bg = self.background,
            fg = self.foreground,
            family = self.font_family.replace('\'', ""),
            size = self.font_size,
            markup = markup,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_round_trip() {
        for theme in Theme::ALL {
            assert_eq!(Theme::from_name(theme.name()), Some(theme));
        }
        assert_eq!(Theme::from_name("solarized dark"), Some(Theme::SolarizedDark));
        assert_eq!(Theme::from_name("Neon"), None);
    }

    #[test]
    fn test_default_theme() {
        assert_eq!(Theme::default(), Theme::SolarizedLight);
    }

    #[test]
    fn test_theme_serializes_as_display_name() {
        let json = serde_json::to_string(&Theme::SolarizedDark).unwrap();
        assert_eq!(json, "\"Solarized Dark\"");
    }

    #[test]
    fn test_display_style_is_pure() {
        let a = display_style(Theme::Dark, "Arial", 12);
        let b = display_style(Theme::Dark, "Arial", 12);
        assert_eq!(a, b);
        assert_eq!(a.background, "#000000");
        assert_eq!(a.foreground, "#FFFFFF");
    }

    #[test]
    fn test_compose_page_embeds_style_and_markup() {
        let style = display_style(Theme::SolarizedLight, "Fira Code", 14);
        let page = style.compose_page("<h1>T</h1>");
        assert!(page.contains("background-color: #FDF6E3"));
        assert!(page.contains("color: #657B83"));
        assert!(page.contains("font-family: 'Fira Code'"));
        assert!(page.contains("font-size: 14pt"));
        assert!(page.contains("<h1>T</h1>"));
    }
}
