use {
    std::fmt,
    serde::{Serialize, Deserialize},
};

/// Auxiliary targets learned from the reviewer-annotated corpora.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AuxiliaryLabel {
    Toxicity,
    Attack,
    Aggression,
}

impl AuxiliaryLabel {
    pub const ALL: [AuxiliaryLabel; 3] = [
        AuxiliaryLabel::Toxicity,
        AuxiliaryLabel::Attack,
        AuxiliaryLabel::Aggression,
    ];

    /// Judgment column in the annotation table that holds the target score.
    pub fn annotation_column(&self) -> &'static str {
        match self {
            AuxiliaryLabel::Toxicity => "toxicity",
            AuxiliaryLabel::Attack => "attack",
            AuxiliaryLabel::Aggression => "aggression",
        }
    }

    /// Column appended to the train/test tables once scored.
    pub fn feature_column(&self) -> &'static str {
        match self {
            AuxiliaryLabel::Toxicity => "toxic_level",
            AuxiliaryLabel::Attack => "attack",
            AuxiliaryLabel::Aggression => "aggression",
        }
    }
}

impl fmt::Display for AuxiliaryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.annotation_column())
    }
}
