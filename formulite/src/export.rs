use std::fmt;
use std::str::FromStr;

use latex2mathml::{latex_to_mathml, DisplayStyle};

use crate::error::{FormuliteError, Result};

const MATHJAX_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";
const EMPTY_CONTENT: &str = "No content to copy";

/// Delimiters placed around a formula when it is copied out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatexWrapper {
    /// `$ ... $`
    Inline,
    /// `$$ ... $$`
    #[default]
    Display,
    /// `\[ ... \]`
    Bracket,
    /// `\( ... \)`
    Paren,
    /// `\begin{equation} ... \end{equation}`
    Equation,
}

impl LatexWrapper {
    pub const ALL: [LatexWrapper; 5] = [
        LatexWrapper::Inline,
        LatexWrapper::Display,
        LatexWrapper::Bracket,
        LatexWrapper::Paren,
        LatexWrapper::Equation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LatexWrapper::Inline => "inline",
            LatexWrapper::Display => "display",
            LatexWrapper::Bracket => "bracket",
            LatexWrapper::Paren => "paren",
            LatexWrapper::Equation => "equation",
        }
    }

    fn delimiters(&self) -> (&'static str, &'static str) {
        match self {
            LatexWrapper::Inline => ("$", "$"),
            LatexWrapper::Display => ("$$", "$$"),
            LatexWrapper::Bracket => ("\\[", "\\]"),
            LatexWrapper::Paren => ("\\(", "\\)"),
            LatexWrapper::Equation => ("\\begin{equation}", "\\end{equation}"),
        }
    }
}

impl fmt::Display for LatexWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LatexWrapper {
    type Err = FormuliteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inline" | "$" => Ok(LatexWrapper::Inline),
            "display" | "$$" => Ok(LatexWrapper::Display),
            "bracket" | "\\[" => Ok(LatexWrapper::Bracket),
            "paren" | "\\(" => Ok(LatexWrapper::Paren),
            "equation" | "begin" => Ok(LatexWrapper::Equation),
            other => Err(FormuliteError::Validation(format!(
                "Unknown LaTeX wrapper '{other}', expected one of: inline, display, bracket, paren, equation"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewTheme {
    #[default]
    Light,
    Dark,
}

impl PreviewTheme {
    fn colors(&self) -> (&'static str, &'static str) {
        match self {
            PreviewTheme::Light => ("white", "black"),
            PreviewTheme::Dark => ("rgb(39, 39, 39)", "white"),
        }
    }
}

/// Re-wrap a formula in the chosen delimiters. Any `$` delimiters already
/// around it are dropped first.
pub fn wrap_latex(latex: &str, wrapper: LatexWrapper) -> Result<String> {
    let body = strip_dollars(latex)?;
    let (open, close) = wrapper.delimiters();
    Ok(format!("{open}{body}{close}"))
}

/// Standalone MathJax page rendering the formula in display mode.
pub fn render_html(latex: &str, theme: PreviewTheme) -> Result<String> {
    let body = escape_html(strip_dollars(latex)?);
    let (background, text) = theme.colors();

    Ok(format!(
        r#"<html>
<head>
    <script id="MathJax-script" async src="{MATHJAX_URL}"></script>
    <script>
    MathJax = {{
        tex: {{
            inlineMath: [ ['$','$'], ["\\(","\\)"] ],
            displayMath: [ ['$$','$$'], ["\\[","\\]"] ],
            processEscapes: true,
            processEnvironments: true,
        }},
        chtml: {{
            displayAlign: "center",
        }},
        options: {{
            enableMenu: false
        }},
    }};
    </script>
    <style>
        body {{
            font-size: 25px;
            background-color: {background};
            color: {text};
        }}
    </style>
</head>
<body>
    <p>$${body}$$</p>
</body>
</html>
"#
    ))
}

/// MathML for the formula, rendered as a display block.
pub fn render_mathml(latex: &str) -> Result<String> {
    let body = strip_dollars(latex)?;
    latex_to_mathml(body, DisplayStyle::Block)
        .map_err(|e| FormuliteError::Validation(format!("Failed to convert LaTeX to MathML: {e}")))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn strip_dollars(latex: &str) -> Result<&str> {
    let body = latex.trim().trim_matches('$');
    if body.trim().is_empty() {
        return Err(FormuliteError::Validation(EMPTY_CONTENT.to_string()));
    }
    Ok(body)
}
