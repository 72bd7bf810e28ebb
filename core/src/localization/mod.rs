pub mod gcc_phat;
pub mod least_squares;
pub mod srp_phat;

pub use gcc_phat::{tdoa_vector, GccPhat, PairCorrelation};
pub use least_squares::LeastSquaresEstimator;
pub use srp_phat::SrpPhatEstimator;
