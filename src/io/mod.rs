use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

pub mod binder;
pub mod container;
pub mod patch;
pub mod types;
mod binary;
mod graph;
mod json;
mod utils;

pub use utils::{aligned_len, padding};

use binder::{MscorlibBinder, TypeNameBinder};
use log::{debug, info};
use thiserror::Error;
use crate::structs::PegboardData;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unexpected end of data while reading {what}.")]
    Truncated { what: &'static str },
    #[error("Length prefix of {what} is negative ({length}).")]
    NegativeLength { what: &'static str, length: i64 },
    #[error("Length of {what} ({length}) does not fit a 32-bit prefix.")]
    LengthOverflow { what: &'static str, length: usize },
    #[error("The {what} is not valid UTF-8.")]
    InvalidUtf8 { what: &'static str },
    #[error("The {what} is not valid UTF-16.")]
    InvalidUtf16 { what: &'static str },
    #[error("Unknown entry tag {tag:#04x} at offset {offset}.")]
    UnknownEntry { tag: u8, offset: u64 },
    #[error("Expected {expected}, found {found}.")]
    UnexpectedEntry { expected: &'static str, found: String },
    #[error("Type name {0:?} could not be bound to a known type.")]
    UnknownType(String),
    #[error("Type id {0} was used before it was defined.")]
    UnknownTypeId(i32),
    #[error("Field {field:?} holds a {found} entry, expected {expected}.")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Data is nested deeper than {max} nodes.")]
    TooDeep { max: usize },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed JSON document: {0}")]
    InvalidJson(String),
    #[error("Unsupported file extension {0:?} (expected .dat, .bytes or .json).")]
    UnsupportedExtension(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Payload encoding.
pub enum Format {
    /// Node-entry stream. Used by `.dat` and `.bytes` files.
    Binary,
    /// JSON document. Never framed, never padded.
    Json,
}

impl Format {
    /// Picks the format from a file extension (ASCII case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "dat" | "bytes" => Some(Format::Binary),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The export choices offered to the user.
pub enum ExportOption {
    DatWithHeader,
    DatNoHeader,
    BytesWithHeader,
    BytesNoHeader,
    Json,
}

impl ExportOption {
    pub const ALL: [ExportOption; 5] = [
        ExportOption::DatWithHeader,
        ExportOption::DatNoHeader,
        ExportOption::BytesWithHeader,
        ExportOption::BytesNoHeader,
        ExportOption::Json,
    ];

    pub fn format(self) -> Format {
        match self {
            ExportOption::Json => Format::Json,
            _ => Format::Binary,
        }
    }

    pub fn with_header(self) -> bool {
        matches!(self, ExportOption::DatWithHeader | ExportOption::BytesWithHeader)
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportOption::DatWithHeader | ExportOption::DatNoHeader => "dat",
            ExportOption::BytesWithHeader | ExportOption::BytesNoHeader => "bytes",
            ExportOption::Json => "json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportOption::DatWithHeader => ".dat (With UABEA Header)",
            ExportOption::DatNoHeader => ".dat (No Header)",
            ExportOption::BytesWithHeader => ".bytes (With UABEA Header)",
            ExportOption::BytesNoHeader => ".bytes (No Header)",
            ExportOption::Json => ".JSON",
        }
    }
}

/// Serializer for the object graph inside the container.
///
/// The container codec only needs these two calls. Both must honour the
/// binder in the same way, so that anything `encode` writes `decode` reads.
pub trait ObjectGraphSerializer {
    fn encode(&self, data: &PegboardData, format: Format, binder: &dyn TypeNameBinder) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8], format: Format, binder: &dyn TypeNameBinder) -> Result<PegboardData>;
}

#[derive(Clone, Copy, Debug, Default)]
/// The bundled serializer: tree model → entry graph → binary stream or JSON.
pub struct NodeEntrySerializer;

impl ObjectGraphSerializer for NodeEntrySerializer {
    fn encode(&self, data: &PegboardData, format: Format, binder: &dyn TypeNameBinder) -> Result<Vec<u8>> {
        let root = graph::to_graph(data)?;
        match format {
            Format::Binary => {
                let mut buf = Vec::new();
                binary::write_graph(&mut buf, &root, binder)?;
                Ok(buf)
            }
            Format::Json => json::write_graph(&root, binder),
        }
    }

    fn decode(&self, bytes: &[u8], format: Format, binder: &dyn TypeNameBinder) -> Result<PegboardData> {
        let root = match format {
            Format::Binary => binary::read_graph(bytes, binder)?,
            Format::Json => json::read_graph(bytes, binder)?,
        };
        graph::from_graph(&root)
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Result of an import.
pub struct Imported {
    /// Name from the container header, empty when there was none.
    pub name: String,
    pub data: PegboardData,
}

/// Decodes a whole file image with the bundled serializer and [`MscorlibBinder`].
pub fn decode(bytes: &[u8], format: Format) -> Result<Imported> {
    decode_with(bytes, format, &NodeEntrySerializer, &MscorlibBinder)
}

pub fn decode_with(
    bytes: &[u8],
    format: Format,
    serializer: &dyn ObjectGraphSerializer,
    binder: &dyn TypeNameBinder,
) -> Result<Imported> {
    let (name, payload) = match format {
        Format::Binary => container::split_container(bytes)?,
        Format::Json => (String::new(), bytes),
    };
    let data = serializer.decode(payload, format, binder)?;
    debug!("[decode] {:?}: {} transforms, {} nodes", data.name, data.transforms.len(), data.node_count());
    Ok(Imported { name, data })
}

/// Encodes a pegboard into a file image with the bundled serializer and [`MscorlibBinder`].
pub fn encode(data: &PegboardData, with_header: bool, format: Format) -> Result<Vec<u8>> {
    encode_with(data, with_header, format, &NodeEntrySerializer, &MscorlibBinder)
}

pub fn encode_with(
    data: &PegboardData,
    with_header: bool,
    format: Format,
    serializer: &dyn ObjectGraphSerializer,
    binder: &dyn TypeNameBinder,
) -> Result<Vec<u8>> {
    let payload = serializer.encode(data, format, binder)?;
    debug!("[encode] payload {} bytes, {format:?}, header: {with_header}", payload.len());

    match format {
        // JSON is never framed, `with_header` does not apply.
        Format::Json => Ok(payload),
        Format::Binary => {
            let payload = patch::fix_color_channels(&payload);
            if with_header {
                container::add_header(&data.name, &payload, true)
            } else {
                Ok(container::pad_to_4(&payload))
            }
        }
    }
}

/// Reads a file, choosing the format from its extension.
pub fn read_file(path: impl AsRef<Path>) -> Result<Imported> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| unsupported(path))?;
    let bytes = fs::read(path)?;
    info!("Importing {} ({} bytes, {format:?})", path.display(), bytes.len());
    decode(&bytes, format)
}

pub fn write_file(path: impl AsRef<Path>, data: &PegboardData, option: ExportOption) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(data, option.with_header(), option.format())?;
    info!("Exporting {} ({} bytes, {})", path.display(), bytes.len(), option.label());
    fs::write(path, bytes)?;
    Ok(())
}

fn unsupported(path: &Path) -> Error {
    Error::UnsupportedExtension(
        path.extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    )
}

impl PegboardData {
    /// `name.<ext>` for the given export option.
    pub fn default_file_name(&self, option: ExportOption) -> String {
        format!("{}.{}", self.name, option.extension())
    }
}

/// Trait for writing a `PegboardData` to a stream.
///
/// # Example
/// ```rust
/// use pegboard_io::structs::*;
/// use pegboard_io::io::{ExportOption, WritePegboard};
///
/// let board = PegboardData::new("board");
/// let mut buffer = Vec::new();
///
/// buffer.write_pegboard(&board, ExportOption::DatWithHeader).unwrap();
/// ```
///
/// # Partial Writes
/// Encoding finishes in memory before anything is written, so a failed
/// encode leaves the stream untouched. A failing stream can still be left
/// with part of the file.
pub trait WritePegboard: Write {
    fn write_pegboard(&mut self, data: &PegboardData, option: ExportOption) -> Result<()> {
        let bytes = encode(data, option.with_header(), option.format())?;
        self.write_all(&bytes)?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WritePegboard for W {}

/// Trait for reading a `PegboardData` from a stream.
///
/// Reads the stream to its end, then decodes.
///
/// # Example
/// ```rust
/// use pegboard_io::structs::*;
/// use pegboard_io::io::{ExportOption, Format, ReadPegboard, WritePegboard};
/// use std::io::Cursor;
///
/// let mut buffer = Vec::new();
/// buffer.write_pegboard(&PegboardData::new("board"), ExportOption::DatWithHeader).unwrap();
///
/// let imported = Cursor::new(buffer).read_pegboard(Format::Binary).unwrap();
/// assert_eq!(imported.name, "board");
/// ```
pub trait ReadPegboard: Read {
    fn read_pegboard(&mut self, format: Format) -> Result<Imported> {
        let mut bytes = Vec::new();
        self.read_to_end(&mut bytes)?;
        decode(&bytes, format)
    }
}

impl<R: Read + ?Sized> ReadPegboard for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::*;

    #[test]
    fn format_from_path() {
        assert_eq!(Format::from_path("a/b/level.dat"), Some(Format::Binary));
        assert_eq!(Format::from_path("level.BYTES"), Some(Format::Binary));
        assert_eq!(Format::from_path("level.json"), Some(Format::Json));
        assert_eq!(Format::from_path("level.txt"), None);
        assert_eq!(Format::from_path("level"), None);
    }

    #[test]
    fn export_options() {
        let with_header: Vec<_> = ExportOption::ALL.iter().filter(|o| o.with_header()).collect();
        assert_eq!(with_header, [&ExportOption::DatWithHeader, &ExportOption::BytesWithHeader]);
        assert_eq!(ExportOption::Json.format(), Format::Json);
        assert_eq!(PegboardData::new("lvl").default_file_name(ExportOption::BytesNoHeader), "lvl.bytes");
    }

    #[test]
    fn binary_output_is_aligned() {
        let mut board = PegboardData::new("abc");
        board.transforms.push(TransformData::new("p"));
        for with_header in [false, true] {
            let bytes = encode(&board, with_header, Format::Binary).unwrap();
            assert_eq!(bytes.len() % 4, 0);
        }
    }

    #[test]
    fn header_name_is_reported() {
        let board = PegboardData::new("board_7");
        let bytes = encode(&board, true, Format::Binary).unwrap();
        let imported = decode(&bytes, Format::Binary).unwrap();
        assert_eq!(imported.name, "board_7");
        assert_eq!(imported.data, board);
    }

    #[test]
    fn json_is_never_framed() {
        let board = PegboardData::new("board");
        let plain = encode(&board, false, Format::Json).unwrap();
        assert_eq!(plain.first(), Some(&b'{'));
        let imported = decode(&plain, Format::Json).unwrap();
        assert_eq!(imported.name, "");
        assert_eq!(imported.data, board);
    }

    #[test]
    fn json_ignores_header_request() {
        let board = PegboardData::new("json");
        let framed = encode(&board, true, Format::Json).unwrap();
        assert_eq!(framed, encode(&board, false, Format::Json).unwrap());
        assert_eq!(framed.first(), Some(&b'{'));
        assert_eq!(decode(&framed, Format::Json).unwrap().data, board);
    }

    #[test]
    fn json_round_trip_with_shared_types() {
        let peg = || Prefab::PegRegular(PegSettings::default());
        let mut board = PegboardData::new("shared");
        board.transforms.push(
            TransformData::new("parent")
                .with_prefab(peg())
                .with_child(TransformData::new("child").with_prefab(peg())),
        );
        board.transforms.push(TransformData::new("sibling").with_prefab(peg()));

        let bytes = encode(&board, false, Format::Json).unwrap();
        assert_eq!(decode(&bytes, Format::Json).unwrap().data, board);
    }

    #[test]
    fn json_depth_limit_is_checked_on_export() {
        let chain = |levels: usize| {
            let mut node = TransformData::new("leaf");
            for _ in 1..levels {
                node = TransformData::new("link").with_child(node);
            }
            let mut board = PegboardData::new("deep");
            board.transforms.push(node);
            board
        };

        // Three nesting levels per transform, three more for the root and its list.
        let board = chain(40);
        let bytes = encode(&board, false, Format::Json).unwrap();
        assert_eq!(decode(&bytes, Format::Json).unwrap().data, board);

        let board = chain(45);
        assert!(matches!(encode(&board, false, Format::Json), Err(Error::TooDeep { .. })));
        let bytes = encode(&board, false, Format::Binary).unwrap();
        assert_eq!(decode(&bytes, Format::Binary).unwrap().data, board);
    }

    #[test]
    fn stream_traits_round_trip() {
        let mut board = PegboardData::new("streamed");
        board.transforms.push(TransformData::new("x").at(3.0, -4.0));
        for option in ExportOption::ALL {
            let mut buf = Vec::new();
            buf.write_pegboard(&board, option).unwrap();
            let imported = std::io::Cursor::new(buf).read_pegboard(option.format()).unwrap();
            assert_eq!(imported.data, board, "{}", option.label());
        }
    }

    #[test]
    fn unsupported_extension() {
        assert!(matches!(read_file("level.txt"), Err(Error::UnsupportedExtension(e)) if e == "txt"));
    }
}
