use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Q10,
    Q50,
    Q90,
    SecondaryMedian,
    SpikeStage1,
    SpikeStage2,
}

impl ModelRole {
    pub fn is_mandatory(self) -> bool {
        matches!(self, ModelRole::Q10 | ModelRole::Q50 | ModelRole::Q90)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelRole::Q10 => "q10",
            ModelRole::Q50 => "q50",
            ModelRole::Q90 => "q90",
            ModelRole::SecondaryMedian => "secondary_median",
            ModelRole::SpikeStage1 => "spike_stage1",
            ModelRole::SpikeStage2 => "spike_stage2",
        }
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn role_order() -> &'static [ModelRole] {
    &[
        ModelRole::Q10,
        ModelRole::Q50,
        ModelRole::Q90,
        ModelRole::SecondaryMedian,
        ModelRole::SpikeStage1,
        ModelRole::SpikeStage2,
    ]
}
