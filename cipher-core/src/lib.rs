pub mod arrays;
pub mod binning;
pub mod boundary;
pub mod geometry;
pub mod input;
pub mod interface;
pub mod material;
pub mod phase_type;
pub mod properties;
pub mod rle;

pub mod errors;

pub use errors::{CipherError, CipherResult, PhasePair};
pub use geometry::{CipherGeometry, GeometryBuilder, NO_INTERFACE};
pub use input::CipherInput;
pub use interface::InterfaceDefinition;
pub use material::MaterialDefinition;
pub use phase_type::PhaseTypeDefinition;
pub use properties::{Properties, PropertyValue};
