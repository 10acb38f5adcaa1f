//! Result extraction from the rendered page.
//!
//! After submission the page holds an unknown mix of decorative assets,
//! loading spinners, and (hopefully) the generated artifact. Selection is a
//! filter over observed `<img>` candidates followed by a largest-area pick.

use serde::Deserialize;

/// Substrings that mark an image as a loading indicator or placeholder
/// rather than generated output.
const PLACEHOLDER_MARKERS: &[&str] = &["spinner", "loading", "placeholder"];

/// One `<img>` observed in the rendered page after submission.
///
/// `width` is the layout width; the natural dimensions are the intrinsic
/// pixel size and drive the area comparison, matching how the page reports
/// its own images.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageCandidate {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default, rename = "naturalWidth")]
    pub natural_width: u32,
    #[serde(default, rename = "naturalHeight")]
    pub natural_height: u32,
}

impl ImageCandidate {
    fn area(&self) -> u64 {
        u64::from(self.natural_width) * u64::from(self.natural_height)
    }

    fn looks_like_placeholder(&self) -> bool {
        let src = self.src.to_ascii_lowercase();
        PLACEHOLDER_MARKERS.iter().any(|m| src.contains(m))
    }
}

/// Select the generated artifact among rendered images.
///
/// Candidates with an empty src, a layout width at or below `min_width`, or
/// a placeholder-looking src are excluded. Among the remainder the one with
/// the greatest natural pixel area wins; ties keep the first encountered.
pub fn select_output_image(candidates: &[ImageCandidate], min_width: u32) -> Option<&ImageCandidate> {
    let mut best: Option<&ImageCandidate> = None;
    for candidate in candidates {
        if candidate.src.is_empty()
            || candidate.width <= min_width
            || candidate.looks_like_placeholder()
        {
            continue;
        }
        match best {
            Some(current) if candidate.area() <= current.area() => {}
            _ => best = Some(candidate),
        }
    }
    best
}
