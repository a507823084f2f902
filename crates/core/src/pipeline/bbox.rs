//! PostScript bounding boxes and SVG size correction.

use once_cell::sync::Lazy;
use regex_lite::{NoExpand, Regex};
use std::borrow::Cow;

static BOUNDING_BOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^%%BoundingBox:[ \t]*(-?[0-9.]+)[ \t]+(-?[0-9.]+)[ \t]+(-?[0-9.]+)[ \t]+(-?[0-9.]+)")
        .unwrap()
});

static SVG_ROOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<svg\b[^>]*>").unwrap());

static WIDTH_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\swidth\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap());

static HEIGHT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sheight\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap());

static VIEWBOX_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sviewBox\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap());

/// The `%%BoundingBox: llx lly urx ury` page extent of a PostScript file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl BoundingBox {
    /// Finds the first `%%BoundingBox` comment. `(atend)` and malformed
    /// boxes yield `None`.
    pub fn parse(content: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(content);
        let caps = BOUNDING_BOX.captures(&text)?;
        let num = |i: usize| caps.get(i)?.as_str().parse::<f64>().ok();
        let bbox = Self {
            llx: num(1)?,
            lly: num(2)?,
            urx: num(3)?,
            ury: num(4)?,
        };
        (bbox.width() > 0.0 && bbox.height() > 0.0).then_some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Rewrites the root element's `width`, `height` and `viewBox` to this
    /// box. Content that is not UTF-8 or has no `<svg>` element is returned
    /// unchanged.
    pub fn apply_svg_dimensions(&self, svg: &[u8]) -> Vec<u8> {
        let Ok(text) = std::str::from_utf8(svg) else {
            return svg.to_vec();
        };
        let Some(root) = SVG_ROOT.find(text) else {
            return svg.to_vec();
        };

        let width = format_number(self.width());
        let height = format_number(self.height());
        let view_box = format!("0 0 {width} {height}");

        let tag = root.as_str();
        let tag = set_attribute(tag, &WIDTH_ATTR, "width", &width);
        let tag = set_attribute(&tag, &HEIGHT_ATTR, "height", &height);
        let tag = set_attribute(&tag, &VIEWBOX_ATTR, "viewBox", &view_box);

        let mut out = String::with_capacity(text.len() + 32);
        out.push_str(&text[..root.start()]);
        out.push_str(&tag);
        out.push_str(&text[root.end()..]);
        out.into_bytes()
    }
}

fn set_attribute<'a>(tag: &'a str, pattern: &Regex, name: &str, value: &str) -> Cow<'a, str> {
    let attr = format!(r#" {name}="{value}""#);
    if pattern.is_match(tag) {
        pattern.replace(tag, NoExpand(&attr))
    } else {
        // Tag always starts with "<svg".
        Cow::Owned(format!("<svg{attr}{}", &tag[4..]))
    }
}

/// Whole numbers without a fractional part, others as-is.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
