//! Allocation snapshot port.

use crate::domain::allocation::AllocationSource;
use crate::domain::cleaning::YieldScale;
use crate::domain::error::MarketLensError;

pub trait AllocationPort {
    fn load_allocation(&self) -> Result<Vec<AllocationSource>, MarketLensError>;

    fn yield_scale(&self) -> YieldScale {
        YieldScale::Percent
    }
}
