use crate::{common::*, element::*, value::*, writer};
use binread::{BinRead, BinReaderExt as _};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read as _};

#[derive(Debug, Clone, BinRead)]
struct RawHeader {
    #[br(count = HEADER_TEXT_SIZE)]
    text: Vec<u8>,
    _subsys_offset: u64,
    version: u16,
    endian_indicator: u16,
}

/// The variables stored in a MAT file, in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatFile {
    variables: IndexMap<String, MatValue>,
}

impl MatFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read MAT file '{}'", path.display()))?;
        Self::parse(&bytes)
            .with_context(|| format!("failed to parse MAT file '{}'", path.display()))
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() >= HEADER_SIZE,
            "the file is shorter than the {}-byte header",
            HEADER_SIZE
        );

        let header: RawHeader = Cursor::new(&bytes[..HEADER_SIZE])
            .read_le()
            .map_err(|err| format_err!("failed to parse MAT header: {:?}", err))?;
        let RawHeader {
            text,
            version,
            endian_indicator,
            ..
        } = header;

        ensure!(
            !text.starts_with(b"MATLAB 7.3"),
            "HDF5-based MAT files (version 7.3) are not supported"
        );

        let body = &bytes[HEADER_SIZE..];
        let variables = match endian_indicator {
            ENDIAN_LE => {
                ensure!(version == VERSION, "unsupported MAT version {:#06x}", version);
                parse_variables::<LittleEndian>(body)?
            }
            ENDIAN_BE => {
                let version = version.swap_bytes();
                ensure!(version == VERSION, "unsupported MAT version {:#06x}", version);
                parse_variables::<BigEndian>(body)?
            }
            _ => bail!("invalid endian indicator {:#06x}", endian_indicator),
        };

        Ok(Self { variables })
    }

    pub fn get(&self, name: &str) -> Option<&MatValue> {
        self.variables.get(name)
    }

    /// Like [MatFile::get], but fails when the variable is absent.
    pub fn variable(&self, name: &str) -> Result<&MatValue> {
        self.get(name)
            .ok_or_else(|| format_err!("variable '{}' not found", name))
    }

    pub fn insert<S>(&mut self, name: S, value: MatValue) -> Option<MatValue>
    where
        S: Into<String>,
    {
        self.variables.insert(name.into(), value)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &MatValue)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Encodes the variables as an uncompressed little-endian MAT file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::write_file(&self.variables)
    }

    pub fn write<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write MAT file '{}'", path.display()))?;
        Ok(())
    }
}

fn parse_variables<E>(body: &[u8]) -> Result<IndexMap<String, MatValue>>
where
    E: ByteOrder,
{
    let mut reader = ElementReader::<E>::new(body);
    let mut variables = IndexMap::new();

    while let Some(element) = reader.next_element()? {
        if element.data_type != MI_MATRIX {
            debug!("skip top-level element of type {}", element.data_type);
            continue;
        }

        let (name, value) = parse_matrix::<E>(&element.data)?;
        variables.insert(name, value);
    }

    Ok(variables)
}

struct Element<'a> {
    data_type: u32,
    data: Cow<'a, [u8]>,
}

struct ElementReader<'a, E> {
    bytes: &'a [u8],
    pos: usize,
    _phantom: PhantomData<E>,
}

impl<'a, E> ElementReader<'a, E>
where
    E: ByteOrder,
{
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            _phantom: PhantomData,
        }
    }

    fn slice(&self, begin: usize, len: usize) -> Result<&'a [u8]> {
        let end = begin
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| format_err!("truncated data element at offset {}", begin))?;
        Ok(&self.bytes[begin..end])
    }

    fn next_element(&mut self) -> Result<Option<Element<'a>>> {
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }

        let tag = self.slice(self.pos, 8)?;
        let first = E::read_u32(&tag[0..4]);

        // small data element packs type, size and up to 4 bytes into the tag
        if first >> 16 != 0 {
            let data_type = first & 0xffff;
            let len = (first >> 16) as usize;
            ensure!(len <= 4, "invalid small data element size {}", len);
            let data = &tag[4..4 + len];
            self.pos += 8;
            return Ok(Some(Element {
                data_type,
                data: Cow::Borrowed(data),
            }));
        }

        let data_type = first;
        let len = E::read_u32(&tag[4..8]) as usize;
        let data = self.slice(self.pos + 8, len)?;

        if data_type == MI_COMPRESSED {
            // compressed elements are not padded
            self.pos += 8 + len;

            let mut inflated = vec![];
            ZlibDecoder::new(data)
                .read_to_end(&mut inflated)
                .with_context(|| "failed to inflate compressed data element")?;
            let mut inner = ElementReader::<E>::new(&inflated);
            let element = inner
                .next_element()?
                .ok_or_else(|| format_err!("empty compressed data element"))?;

            return Ok(Some(Element {
                data_type: element.data_type,
                data: Cow::Owned(element.data.into_owned()),
            }));
        }

        self.pos = (self.pos + 8 + padded_len(len)).min(self.bytes.len());
        Ok(Some(Element {
            data_type,
            data: Cow::Borrowed(data),
        }))
    }

    fn expect_element(&mut self, what: &str) -> Result<Element<'a>> {
        self.next_element()?
            .ok_or_else(|| format_err!("missing {} in matrix element", what))
    }
}

fn parse_matrix<E>(data: &[u8]) -> Result<(String, MatValue)>
where
    E: ByteOrder,
{
    // an empty matrix element stands for an empty array
    if data.is_empty() {
        let empty = NumericArray::new(NumericClass::Double, vec![0, 0], vec![])?;
        return Ok((String::new(), empty.into()));
    }

    let mut reader = ElementReader::<E>::new(data);

    // array flags
    let flags = reader.expect_element("array flags")?;
    ensure!(
        flags.data_type == MI_UINT32 && flags.data.len() == 8,
        "malformed array flags"
    );
    let flags = E::read_u32(&flags.data[0..4]);
    let class = (flags & 0xff) as u8;

    // dimensions
    let dims = reader.expect_element("dimensions")?;
    ensure!(dims.data_type == MI_INT32, "malformed dimensions");
    let dims: Vec<usize> = decode_numbers::<E>(MI_INT32, &dims.data)?
        .into_iter()
        .map(|dim| {
            ensure!(dim >= 0.0, "negative dimension {}", dim);
            Ok(dim as usize)
        })
        .try_collect()?;
    let num_elements = checked_num_elements(&dims)?;
    // every nested element takes at least one 8-byte tag
    let max_children = data.len() / 8;

    // name
    let name = reader.expect_element("array name")?;
    ensure!(
        matches!(name.data_type, MI_INT8 | MI_UINT8),
        "malformed array name"
    );
    let name = String::from_utf8_lossy(&name.data).into_owned();

    let value: MatValue = match class {
        MX_CELL => {
            ensure!(
                num_elements <= max_children,
                "{} cells do not fit in {} bytes",
                num_elements,
                data.len()
            );
            let mut cells = Vec::with_capacity(num_elements);
            for _ in 0..num_elements {
                cells.push(parse_child::<E>(&mut reader, "cell")?);
            }
            CellArray::new(dims, cells)?.into()
        }
        MX_STRUCT => {
            let name_len = reader.expect_element("field name length")?;
            let name_len = decode_numbers::<E>(name_len.data_type, &name_len.data)?;
            let name_len = match name_len.as_slice() {
                &[len] if len > 0.0 => len as usize,
                _ => bail!("malformed field name length"),
            };

            let names = reader.expect_element("field names")?;
            ensure!(
                names.data.len() % name_len == 0,
                "field names are not a multiple of {} bytes",
                name_len
            );
            let fields: IndexSet<String> = names
                .data
                .chunks(name_len)
                .map(|chunk| {
                    let end = chunk.iter().position(|&byte| byte == 0).unwrap_or(chunk.len());
                    String::from_utf8_lossy(&chunk[..end]).into_owned()
                })
                .collect();

            ensure!(
                num_elements.saturating_mul(fields.len().max(1)) <= max_children,
                "{} struct elements with {} fields do not fit in {} bytes",
                num_elements,
                fields.len(),
                data.len()
            );
            let mut elements = Vec::with_capacity(num_elements);
            for _ in 0..num_elements {
                let mut values = Vec::with_capacity(fields.len());
                for _ in 0..fields.len() {
                    values.push(parse_child::<E>(&mut reader, "struct field")?);
                }
                elements.push(values);
            }
            StructArray::new(dims, fields, elements)?.into()
        }
        MX_CHAR => {
            let chars = match reader.next_element()? {
                Some(element) => decode_chars::<E>(element.data_type, &element.data)?,
                None => vec![],
            };
            CharArray::new(dims, chars)?.into()
        }
        MX_OBJECT => bail!("object arrays are not supported"),
        MX_SPARSE => bail!("sparse arrays are not supported"),
        code => {
            let numeric_class = NumericClass::from_code(code)
                .ok_or_else(|| format_err!("unsupported array class {}", code))?;
            ensure!(
                flags & FLAG_COMPLEX == 0,
                "complex arrays are not supported"
            );
            let data = match reader.next_element()? {
                Some(element) => decode_numbers::<E>(element.data_type, &element.data)?,
                None => vec![],
            };
            NumericArray::new(numeric_class, dims, data)?.into()
        }
    };

    Ok((name, value))
}

/// Parses the next nested matrix element of a cell or struct array.
fn parse_child<E>(reader: &mut ElementReader<'_, E>, what: &str) -> Result<MatValue>
where
    E: ByteOrder,
{
    let element = reader.expect_element(what)?;
    ensure!(
        element.data_type == MI_MATRIX,
        "expect a matrix element for {}, but found type {}",
        what,
        element.data_type
    );
    let (_, value) = parse_matrix::<E>(&element.data)?;
    Ok(value)
}

fn decode_numbers<E>(data_type: u32, bytes: &[u8]) -> Result<Vec<f64>>
where
    E: ByteOrder,
{
    let width = match data_type {
        MI_INT8 | MI_UINT8 => 1,
        MI_INT16 | MI_UINT16 => 2,
        MI_INT32 | MI_UINT32 | MI_SINGLE => 4,
        MI_DOUBLE | MI_INT64 | MI_UINT64 => 8,
        _ => bail!("data type {} is not numeric", data_type),
    };
    ensure!(
        bytes.len() % width == 0,
        "{} bytes of numeric data is not a multiple of {}",
        bytes.len(),
        width
    );

    let values = bytes.chunks_exact(width).map(|chunk| match data_type {
        MI_INT8 => chunk[0] as i8 as f64,
        MI_UINT8 => chunk[0] as f64,
        MI_INT16 => E::read_i16(chunk) as f64,
        MI_UINT16 => E::read_u16(chunk) as f64,
        MI_INT32 => E::read_i32(chunk) as f64,
        MI_UINT32 => E::read_u32(chunk) as f64,
        MI_SINGLE => E::read_f32(chunk) as f64,
        MI_DOUBLE => E::read_f64(chunk),
        MI_INT64 => E::read_i64(chunk) as f64,
        MI_UINT64 => E::read_u64(chunk) as f64,
        _ => unreachable!(),
    });
    Ok(values.collect())
}

fn decode_chars<E>(data_type: u32, bytes: &[u8]) -> Result<Vec<u16>>
where
    E: ByteOrder,
{
    let chars = match data_type {
        MI_UTF8 => std::str::from_utf8(bytes)?.encode_utf16().collect(),
        MI_UINT16 | MI_UTF16 => {
            ensure!(bytes.len() % 2 == 0, "odd number of bytes in char data");
            bytes.chunks_exact(2).map(E::read_u16).collect()
        }
        MI_INT8 | MI_UINT8 => bytes.iter().map(|&byte| byte as u16).collect(),
        _ => bail!("data type {} cannot hold characters", data_type),
    };
    Ok(chars)
}
