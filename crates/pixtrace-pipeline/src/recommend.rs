//! Method recommendation: a scored choice between tracing and embedding.
//!
//! Each signal adds to (favours tracing) or subtracts from (favours
//! embedding) an integer score:
//!
//! | Signal             | Condition     | Score |
//! |--------------------|---------------|-------|
//! | complexity         | low           | +3    |
//! | complexity         | medium        | +1    |
//! | complexity         | high          | −2    |
//! | `is_photo`         | true          | −3    |
//! | `num_colors`       | < 20          | +2    |
//! | `num_colors`       | > 200         | −2    |
//! | `has_transparency` | true          | +1    |
//! | `total_pixels`     | > 2,000,000   | −1    |
//!
//! A score above [`DECISION_MARGIN`] picks tracing, below its negation
//! picks embedding, and the band in between falls back on image size.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyze::{Complexity, ImageAnalysis};

/// Scores strictly beyond `±DECISION_MARGIN` leave the neutral band.
pub const DECISION_MARGIN: i32 = 2;

/// Confidence ceiling for a directional decision.
pub const MAX_CONFIDENCE: f64 = 0.9;

/// Confidence in the neutral band.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Pixel count at or above which the neutral band prefers embedding.
pub const NEUTRAL_EMBED_PIXELS: u64 = 1_000_000;

/// Pixel count above which the image counts as large.
pub const LARGE_IMAGE_PIXELS: u64 = 2_000_000;

/// Conversion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Contour tracing into filled polygon paths.
    Trace,
    /// Base64 raster embedding.
    Embed,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => f.write_str("trace"),
            Self::Embed => f.write_str("embed"),
        }
    }
}

/// Suggested method with confidence and the signals behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Suggested method.
    pub method: Method,
    /// In `[0.5, 0.9]`; exactly 0.5 in the neutral band.
    pub confidence: f64,
    /// Summed signal score; positive favours tracing.
    pub score: i32,
    /// One entry per triggered signal, in table order, plus the
    /// neutral-band tie-break when taken.
    pub reasons: Vec<String>,
}

impl Recommendation {
    /// Rationale joined for display.
    #[must_use]
    pub fn reason(&self) -> String {
        self.reasons.join(" | ")
    }
}

/// Recommend a conversion method for an analyzed image.
#[must_use]
pub fn recommend(analysis: &ImageAnalysis) -> Recommendation {
    let mut score = 0;
    let mut reasons = Vec::new();

    match analysis.complexity {
        Complexity::Low => {
            score += 3;
            reasons.push("Low complexity -> ideal for vectorization".to_owned());
        }
        Complexity::Medium => {
            score += 1;
            reasons.push("Medium complexity -> vectorization possible".to_owned());
        }
        Complexity::High => {
            score -= 2;
            reasons.push("High complexity -> embedding recommended".to_owned());
        }
    }

    if analysis.is_photo {
        score -= 3;
        reasons.push("Photo characteristics detected -> embedding is better".to_owned());
    }

    if analysis.num_colors < 20 {
        score += 2;
        reasons.push(format!(
            "Few colors ({}) -> good for vectors",
            analysis.num_colors
        ));
    } else if analysis.num_colors > 200 {
        score -= 2;
        reasons.push(format!(
            "Many colors ({}) -> embedding is better",
            analysis.num_colors
        ));
    }

    if analysis.has_transparency {
        score += 1;
        reasons.push("Transparency present -> vectorization can use it".to_owned());
    }

    if analysis.total_pixels > LARGE_IMAGE_PIXELS {
        score -= 1;
        reasons.push("Large image -> embedding may be more efficient".to_owned());
    }

    let (method, confidence) = if score > DECISION_MARGIN {
        (Method::Trace, directional_confidence(score))
    } else if score < -DECISION_MARGIN {
        (Method::Embed, directional_confidence(score))
    } else if analysis.total_pixels < NEUTRAL_EMBED_PIXELS {
        reasons.push("Standard size -> try vectorization".to_owned());
        (Method::Trace, NEUTRAL_CONFIDENCE)
    } else {
        reasons.push("Larger image -> embedding is safer".to_owned());
        (Method::Embed, NEUTRAL_CONFIDENCE)
    };

    Recommendation {
        method,
        confidence,
        score,
        reasons,
    }
}

/// `min(0.9, 0.5 + 0.1 * |score|)`.
fn directional_confidence(score: i32) -> f64 {
    0.1f64
        .mul_add(f64::from(score.unsigned_abs()), NEUTRAL_CONFIDENCE)
        .min(MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(
        complexity: Complexity,
        num_colors: usize,
        is_photo: bool,
        has_transparency: bool,
        total_pixels: u64,
    ) -> ImageAnalysis {
        ImageAnalysis {
            width: 0,
            height: 0,
            total_pixels,
            has_alpha: has_transparency,
            has_transparency,
            is_grayscale: false,
            num_colors,
            num_colors_is_estimate: false,
            complexity,
            is_photo,
            variance: 0.0,
        }
    }

    #[test]
    fn simple_logo_recommends_trace_at_max_confidence() {
        let rec = recommend(&analysis(Complexity::Low, 5, false, false, 400));
        assert_eq!(rec.score, 5);
        assert_eq!(rec.method, Method::Trace);
        assert!((rec.confidence - 0.9).abs() < 1e-12);
        assert_eq!(rec.reasons.len(), 2);
    }

    #[test]
    fn photo_recommends_embed() {
        let rec = recommend(&analysis(Complexity::High, 5000, true, false, 3_000_000));
        // -2 - 3 - 2 - 1
        assert_eq!(rec.score, -8);
        assert_eq!(rec.method, Method::Embed);
        assert!((rec.confidence - 0.9).abs() < 1e-12);
        assert_eq!(rec.reasons.len(), 4);
    }

    #[test]
    fn moderate_embed_confidence_scales_with_score() {
        // High complexity and many colors: -4.
        let rec = recommend(&analysis(Complexity::High, 300, false, false, 100));
        assert_eq!(rec.score, -4);
        assert_eq!(rec.method, Method::Embed);
        assert!((rec.confidence - 0.9).abs() < 1e-12);

        // High complexity, mid color count, large image: -3.
        let rec = recommend(&analysis(Complexity::High, 100, false, false, 2_000_001));
        assert_eq!(rec.score, -3);
        assert!((rec.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn neutral_band_small_image_traces() {
        // Medium complexity, mid color count: +1.
        let rec = recommend(&analysis(Complexity::Medium, 50, false, false, 999_999));
        assert_eq!(rec.score, 1);
        assert_eq!(rec.method, Method::Trace);
        assert!((rec.confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            rec.reasons,
            vec![
                "Medium complexity -> vectorization possible".to_owned(),
                "Standard size -> try vectorization".to_owned(),
            ]
        );
    }

    #[test]
    fn neutral_band_large_image_embeds() {
        let rec = recommend(&analysis(Complexity::Medium, 50, false, false, 1_000_000));
        assert_eq!(rec.method, Method::Embed);
        assert!((rec.confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(rec.reasons.last().map(String::as_str), Some("Larger image -> embedding is safer"));
    }

    #[test]
    fn band_edges_are_neutral() {
        // Medium + transparency = +2, still neutral.
        let rec = recommend(&analysis(Complexity::Medium, 50, false, true, 10));
        assert_eq!(rec.score, 2);
        assert!((rec.confidence - 0.5).abs() < f64::EPSILON);
        // High complexity alone = -2, still neutral.
        let rec = recommend(&analysis(Complexity::High, 50, false, false, 10));
        assert_eq!(rec.score, -2);
        assert_eq!(rec.method, Method::Trace);
        assert!((rec.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn reasons_follow_table_order() {
        let rec = recommend(&analysis(Complexity::Low, 3, false, true, 2_500_000));
        assert_eq!(
            rec.reasons,
            vec![
                "Low complexity -> ideal for vectorization".to_owned(),
                "Few colors (3) -> good for vectors".to_owned(),
                "Transparency present -> vectorization can use it".to_owned(),
                "Large image -> embedding may be more efficient".to_owned(),
            ]
        );
        assert_eq!(rec.score, 5);
        assert!(rec.reason().starts_with("Low complexity -> ideal for vectorization | Few colors"));
    }

    #[test]
    fn confidence_stays_in_range() {
        for complexity in [Complexity::Low, Complexity::Medium, Complexity::High] {
            for colors in [1, 50, 1000] {
                for photo in [false, true] {
                    for transparency in [false, true] {
                        for pixels in [100, 1_500_000, 5_000_000] {
                            let rec = recommend(&analysis(
                                complexity,
                                colors,
                                photo,
                                transparency,
                                pixels,
                            ));
                            assert!((0.5..=0.9).contains(&rec.confidence));
                            if rec.score.abs() <= DECISION_MARGIN {
                                assert!((rec.confidence - 0.5).abs() < f64::EPSILON);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn recommendation_is_pure() {
        let input = analysis(Complexity::Medium, 150, true, true, 1_200_000);
        assert_eq!(recommend(&input), recommend(&input));
    }

    #[test]
    fn method_displays_lowercase() {
        assert_eq!(Method::Trace.to_string(), "trace");
        assert_eq!(Method::Embed.to_string(), "embed");
    }
}
