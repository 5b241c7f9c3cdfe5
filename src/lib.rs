//! # Pegboard Level Library
//!
//! This library reads and writes the **pegboard level files** of a peg-clearing
//! game, as exported by asset-bundle editors (`.dat`, `.bytes`) or as JSON.
//!
//! ## Disclaimer
//!
//! - This library is **not affiliated with the game developer**.
//! - The file layout was **reverse-engineered from exported levels**.
//! - Full validation of written files can **only be done by loading them in the game**.
//!
//! ## Layout
//!
//! - [`structs`]: the tree model (`PegboardData`, `TransformData`, `Prefab`, ...).
//!   Plain data containers, built by decoding or by hand.
//! - [`io`]: the container codec (optional named header, 4-byte alignment),
//!   the color-channel rewrite pass, and the object-graph serializer.
//! - [`traverse`]: pre-order walks over the transform forest.
//! - [`edit`] and [`schema`]: string-driven field editing through a
//!   compile-time field schema.
//!
//! ## Example
//! ```rust
//! use pegboard_io::structs::*;
//! use pegboard_io::io::{decode, encode, Format};
//!
//! let mut board = PegboardData::new("level_1");
//! board.transforms.push(TransformData::new("Root").at(1.0, 2.0));
//!
//! // Serialize it, with the asset header
//! let bytes = encode(&board, true, Format::Binary).unwrap();
//!
//! // Deserialize it
//! let imported = decode(&bytes, Format::Binary).unwrap();
//! assert_eq!(imported.name, "level_1");
//! assert_eq!(imported.data, board);
//! ```

pub mod edit;
pub mod io;
pub mod schema;
pub mod structs;
pub mod traverse;

pub use edit::{apply_edits, EditError, EditReport};
pub use io::{decode, encode, Error, ExportOption, Format, Imported, ReadPegboard, Result, WritePegboard};
pub use structs::{PegboardData, Prefab, TransformData};
