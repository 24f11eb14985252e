#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFlag {
    Stage1Tiered,
    Stage2Tiered,
    Widened,
    LowerClamped,
    UpperClamped,
}

impl RowFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            RowFlag::Stage1Tiered => "STAGE1_TIERED",
            RowFlag::Stage2Tiered => "STAGE2_TIERED",
            RowFlag::Widened => "WIDENED",
            RowFlag::LowerClamped => "LOWER_CLAMPED",
            RowFlag::UpperClamped => "UPPER_CLAMPED",
        }
    }
}

pub fn flag_order() -> &'static [RowFlag] {
    &[
        RowFlag::Stage1Tiered,
        RowFlag::Stage2Tiered,
        RowFlag::Widened,
        RowFlag::LowerClamped,
        RowFlag::UpperClamped,
    ]
}

/// Per-row trace of what the correction cascade and enforcer did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDiagnostics {
    /// 0 = untiered, otherwise 1-based index of the highest tier exceeded.
    pub stage1_tier: u8,
    pub stage2_tier: u8,
    pub correction: f64,
    pub flags: Vec<RowFlag>,
}

impl RowDiagnostics {
    pub fn has(&self, flag: RowFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Flags joined in canonical order, `-` when none.
    pub fn flags_label(&self) -> String {
        let names = flag_order()
            .iter()
            .filter(|f| self.has(**f))
            .map(|f| f.as_str())
            .collect::<Vec<_>>();
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(",")
        }
    }
}
