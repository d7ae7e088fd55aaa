// Adapters layer: concrete implementations of the domain ports for the
// S-PLUS services and the CSV inputs of a batch run.

pub mod splus;
pub mod table;

pub use splus::{sort_bands_by_wavelength, wavelength, SplusClient, SplusConfig, SPLUS_WAVELENGTHS};
pub use table::{read_objects, ZeroPointTable};
