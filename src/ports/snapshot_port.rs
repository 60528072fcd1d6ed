//! Raw instrument snapshot port.

use crate::domain::cleaning::YieldScale;
use crate::domain::error::MarketLensError;
use crate::domain::instrument::InstrumentRecord;

pub trait SnapshotPort {
    fn load_snapshot(&self) -> Result<Vec<InstrumentRecord>, MarketLensError>;

    /// Scale in which this source reports dividend yields.
    fn yield_scale(&self) -> YieldScale {
        YieldScale::Percent
    }
}
