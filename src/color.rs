use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RGBA_REGEX: Regex =
        Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})").unwrap();
}

/// Page background for cells without a usable `bgColor`.
pub const DEFAULT_BACKGROUND: &str = "#fff";
/// Text color for cells without a usable `fontColor`.
pub const DEFAULT_FONT: &str = "#000";

/// Converts a backend `0xAARRGGBB` color into a CSS color.
///
/// Opaque colors become `#RRGGBB`; anything with partial alpha becomes
/// `rgba(r,g,b,a)` with the alpha rounded to two decimals. Returns `None`
/// for absent input or anything that is not exactly 8 hex digits once the
/// `0x` prefix is stripped.
pub fn convert_color(code: Option<&str>) -> Option<String> {
    let [a, r, g, b] = parse_argb(code?)?;

    if a == 255 {
        Some(format!("#{:02X}{:02X}{:02X}", r, g, b))
    } else {
        Some(format!("rgba({},{},{},{:.2})", r, g, b, a as f64 / 255.0))
    }
}

fn parse_argb(code: &str) -> Option<[u8; 4]> {
    let hex = code.strip_prefix("0x").unwrap_or(code);
    if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let mut bytes = [0u8; 4];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(bytes)
}

/// Re-encodes a CSS color produced by [`convert_color`] as spreadsheet ARGB.
///
/// Fills in the workbook are always opaque, so the alpha byte is forced to
/// `FF` whatever the CSS alpha was.
pub fn css_to_argb(css: &str) -> Option<String> {
    if let Some(hex) = css.strip_prefix('#') {
        if hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(format!("FF{}", hex.to_ascii_uppercase()));
        }
        return None;
    }

    let caps = RGBA_REGEX.captures(css)?;
    let channel = |i: usize| caps.get(i)?.as_str().parse::<u8>().ok();
    Some(format!("FF{:02X}{:02X}{:02X}", channel(1)?, channel(2)?, channel(3)?))
}

/// Backend color straight to spreadsheet ARGB.
pub fn spreadsheet_argb(code: Option<&str>) -> Option<String> {
    css_to_argb(&convert_color(code)?)
}

/// `FFRRGGBB` to the `0xRRGGBB` integer the xlsx writer takes.
pub fn argb_to_rgb(argb: &str) -> Option<u32> {
    if argb.len() != 8 || !argb.is_ascii() {
        return None;
    }
    u32::from_str_radix(&argb[2..], 16).ok()
}

/// Only the `"bold"` style tag has an effect.
pub fn is_bold(font_style: Option<&str>) -> bool {
    font_style == Some("bold")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_colors_become_hex() {
        assert_eq!(convert_color(Some("0xFFFF0000")).as_deref(), Some("#FF0000"));
        assert_eq!(convert_color(Some("0xff00ff7f")).as_deref(), Some("#00FF7F"));
    }

    #[test]
    fn partial_alpha_becomes_rgba() {
        assert_eq!(convert_color(Some("0x80FF0000")).as_deref(), Some("rgba(255,0,0,0.50)"));
        assert_eq!(convert_color(Some("0x00000000")).as_deref(), Some("rgba(0,0,0,0.00)"));
    }

    #[test]
    fn invalid_colors_are_none() {
        assert_eq!(convert_color(Some("notacolor")), None);
        assert_eq!(convert_color(Some("0xFF0000")), None);
        assert_eq!(convert_color(Some("0xGGFF0000")), None);
        assert_eq!(convert_color(Some("")), None);
        assert_eq!(convert_color(None), None);
    }

    #[test]
    fn css_back_to_argb() {
        assert_eq!(css_to_argb("#00FF00").as_deref(), Some("FF00FF00"));
        assert_eq!(css_to_argb("rgba(0,255,0,0.3)").as_deref(), Some("FF00FF00"));
        assert_eq!(css_to_argb("rgba(0, 255, 0, 0.3)").as_deref(), Some("FF00FF00"));
        assert_eq!(css_to_argb("rgb(16,32,48)").as_deref(), Some("FF102030"));
        assert_eq!(css_to_argb("red"), None);
        assert_eq!(css_to_argb("rgba(300,0,0,1)"), None);
    }

    #[test]
    fn backend_color_to_workbook_color() {
        assert_eq!(spreadsheet_argb(Some("0x4000FF00")).as_deref(), Some("FF00FF00"));
        assert_eq!(argb_to_rgb("FFFFA500"), Some(0xFFA500));
        assert_eq!(argb_to_rgb("FFA500"), None);
    }

    #[test]
    fn bold_flag() {
        assert!(is_bold(Some("bold")));
        assert!(!is_bold(Some("italic")));
        assert!(!is_bold(Some("BOLD")));
        assert!(!is_bold(None));
    }
}
