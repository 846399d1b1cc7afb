//! Mapping loaded configuration onto the aligner's parameter types.

use dynaconf::{DivisorName, DivisorSetting, DynaConfig, WindowConfig};
use dynalign::{AlignParams, Divisor, GapFillParams, MatchParams, Window};

fn window(config: &WindowConfig) -> Window {
    Window {
        before: config.before,
        after: config.after,
        divisor: match config.divisor {
            DivisorSetting::Named(DivisorName::Mean) => Divisor::Mean,
            DivisorSetting::Fixed(d) => Divisor::Fixed(d),
        },
    }
}

pub fn align_params(config: &DynaConfig) -> AlignParams {
    AlignParams {
        matching: MatchParams {
            tolerance: config.matching.tolerance,
            exclusive: config.matching.exclusive,
        },
        gap_fill: GapFillParams {
            velocity: window(&config.gap_fill.velocity),
            length: window(&config.gap_fill.length),
        },
    }
}
