//! Web-service correction

use super::node::PowerId;
use super::{CorrectionChain, CorrectionError};
use crate::calculators::RowCalculator;
use crate::dataset::Dataset;

/// Power estimated row by row by an external service client.
///
/// Roots itself on a fresh column-less source; the client decides which
/// columns it reads.
#[derive(Debug, Clone, Copy)]
pub struct WebServiceCorrection {
    pub node: PowerId,
}

impl WebServiceCorrection {
    pub const LABEL: &'static str = "WebService";

    pub fn apply<C: RowCalculator + ?Sized>(
        chain: &mut CorrectionChain,
        dataset: &mut Dataset,
        web_service: &mut C,
    ) -> Result<Self, CorrectionError> {
        let source = chain.columnless_source();
        let node = chain.power_correction(Self::LABEL, source)?;
        chain.finalise_power(node, dataset, web_service)?;
        Ok(Self { node })
    }
}
