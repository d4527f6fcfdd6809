//! Rehearsal report returned by the results endpoint.
//!
//! The JSON field names are the wire contract shared by the server, the
//! client and any replacement analysis backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Pace {
    #[serde(rename = "A little fast")]
    Fast,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "A little slow")]
    Slow,
}

impl Pace {
    pub const ALL: [Pace; 3] = [Pace::Fast, Pace::Good, Pace::Slow];

    pub fn label(&self) -> &'static str {
        match self {
            Pace::Fast => "A little fast",
            Pace::Good => "Good",
            Pace::Slow => "A little slow",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VocalVariety {
    #[serde(rename = "Quite monotone")]
    Monotone,
    #[serde(rename = "Some variation")]
    SomeVariation,
    #[serde(rename = "Good variation")]
    GoodVariation,
}

impl VocalVariety {
    pub const ALL: [VocalVariety; 3] = [
        VocalVariety::Monotone,
        VocalVariety::SomeVariation,
        VocalVariety::GoodVariation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VocalVariety::Monotone => "Quite monotone",
            VocalVariety::SomeVariation => "Some variation",
            VocalVariety::GoodVariation => "Good variation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coaching {
    pub headline: String,
    pub focus_label: String,
    pub why_it_matters: String,
    pub quick_fix: String,
    pub next_take_prompt: String,
    #[serde(default)]
    pub bridge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Share of the take spent looking at the lens, 0-100.
    pub eyeline_percent: u8,
    pub pace: Pace,
    pub vocal_variety: VocalVariety,
    pub filler_words: u32,
    /// 0-10, one decimal place.
    pub confidence_score: f64,
    #[serde(default)]
    pub note: String,
    pub coaching: Coaching,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Report {
        Report {
            eyeline_percent: 77,
            pace: Pace::Fast,
            vocal_variety: VocalVariety::SomeVariation,
            filler_words: 9,
            confidence_score: 6.4,
            note: "indicators only".into(),
            coaching: Coaching {
                headline: "What stood out most".into(),
                focus_label: "Opening clarity".into(),
                why_it_matters: "why".into(),
                quick_fix: "fix".into(),
                next_take_prompt: "next".into(),
                bridge: "bridge".into(),
            },
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["eyelinePercent"], json!(77));
        assert_eq!(value["pace"], json!("A little fast"));
        assert_eq!(value["vocalVariety"], json!("Some variation"));
        assert_eq!(value["fillerWords"], json!(9));
        assert_eq!(value["confidenceScore"], json!(6.4));
        assert_eq!(value["coaching"]["focusLabel"], json!("Opening clarity"));
        assert_eq!(value["coaching"]["nextTakePrompt"], json!("next"));
    }

    #[test]
    fn labels_match_serialized_form() {
        for pace in Pace::ALL {
            assert_eq!(serde_json::to_value(pace).unwrap(), json!(pace.label()));
        }
        for variety in VocalVariety::ALL {
            assert_eq!(serde_json::to_value(variety).unwrap(), json!(variety.label()));
        }
    }
}
