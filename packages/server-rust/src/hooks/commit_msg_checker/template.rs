//! Liquid templates for notification mails.
//!
//! Parsing and rendering use the `liquid` standard library (filters, `if`,
//! `for`, `assign`, ...). Template source arrives with the request, so it is
//! screened for nesting depth before the parser sees it.

use std::sync::LazyLock;

use hookshot_core::Mapping;

/// Deepest block or bracket nesting accepted in template source.
pub const MAX_NESTING: usize = 32;

/// Block tags that open a nesting level closed by their `end` tag.
const BLOCK_TAGS: &[&str] = &["for", "if", "unless", "case", "capture", "tablerow", "ifchanged"];

static PARSER: LazyLock<Result<liquid::Parser, String>> = LazyLock::new(|| {
    liquid::ParserBuilder::with_stdlib()
        .build()
        .map_err(|err| err.to_string())
});

/// Template errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("template syntax error: {0}")]
    Syntax(String),
    #[error("template render error: {0}")]
    Render(String),
}

/// A parsed template.
pub struct Template {
    inner: liquid::Template,
}

impl Template {
    /// Parse template source.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::TooDeep`] when blocks, brackets or
    /// parentheses nest deeper than [`MAX_NESTING`], and
    /// [`TemplateError::Syntax`] for anything the Liquid parser rejects.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        check_nesting(source)?;
        let parser = PARSER.as_ref().map_err(|err| TemplateError::Syntax(err.clone()))?;
        let inner = parser
            .parse(source)
            .map_err(|err| TemplateError::Syntax(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Render against top-level variables.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] when the template reads a variable
    /// the globals do not define or a filter rejects its input.
    pub fn render(&self, globals: &Mapping) -> Result<String, TemplateError> {
        let globals = liquid::model::to_object(globals)
            .map_err(|err| TemplateError::Render(err.to_string()))?;
        self.inner
            .render(&globals)
            .map_err(|err| TemplateError::Render(err.to_string()))
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template").finish_non_exhaustive()
    }
}

/// Reject source whose block tags, or brackets and parentheses inside a
/// tag, nest deeper than [`MAX_NESTING`]. Content of `raw` and `comment`
/// blocks is skipped. Unclosed tags are left for the parser to report.
fn check_nesting(source: &str) -> Result<(), TemplateError> {
    let mut depth = 0usize;
    let mut literal: Option<&str> = None;
    let mut rest = source;

    while let Some(open) = [rest.find("{{"), rest.find("{%")].into_iter().flatten().min() {
        let is_tag = rest[open..].starts_with("{%");
        let inner_start = open + 2;
        let Some(len) = rest[inner_start..].find(if is_tag { "%}" } else { "}}" }) else {
            break;
        };
        let inner = &rest[inner_start..inner_start + len];
        rest = &rest[inner_start + len + 2..];

        if let Some(end) = literal {
            if is_tag && tag_name(inner) == end {
                literal = None;
            }
            continue;
        }
        if bracket_depth(inner) > MAX_NESTING {
            return Err(TemplateError::TooDeep(MAX_NESTING));
        }
        if !is_tag {
            continue;
        }
        match tag_name(inner) {
            "raw" => literal = Some("endraw"),
            "comment" => literal = Some("endcomment"),
            name if BLOCK_TAGS.contains(&name) => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(TemplateError::TooDeep(MAX_NESTING));
                }
            }
            name if name.starts_with("end") => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

/// First word of a tag, ignoring whitespace-control dashes.
fn tag_name(inner: &str) -> &str {
    inner
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .split_whitespace()
        .next()
        .unwrap_or_default()
}

fn bracket_depth(inner: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for c in inner.chars() {
        match c {
            '[' | '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
