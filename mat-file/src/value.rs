use crate::{common::*, element::*};

/// The storage class of a numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl NumericClass {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        let class = match code {
            6 => Self::Double,
            7 => Self::Single,
            8 => Self::Int8,
            9 => Self::UInt8,
            10 => Self::Int16,
            11 => Self::UInt16,
            12 => Self::Int32,
            13 => Self::UInt32,
            14 => Self::Int64,
            15 => Self::UInt64,
            _ => return None,
        };
        Some(class)
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Double => 6,
            Self::Single => 7,
            Self::Int8 => 8,
            Self::UInt8 => 9,
            Self::Int16 => 10,
            Self::UInt16 => 11,
            Self::Int32 => 12,
            Self::UInt32 => 13,
            Self::Int64 => 14,
            Self::UInt64 => 15,
        }
    }

    /// The data element type used to store values of this class.
    pub(crate) fn data_type(self) -> u32 {
        match self {
            Self::Double => MI_DOUBLE,
            Self::Single => MI_SINGLE,
            Self::Int8 => MI_INT8,
            Self::UInt8 => MI_UINT8,
            Self::Int16 => MI_INT16,
            Self::UInt16 => MI_UINT16,
            Self::Int32 => MI_INT32,
            Self::UInt32 => MI_UINT32,
            Self::Int64 => MI_INT64,
            Self::UInt64 => MI_UINT64,
        }
    }
}

fn num_elements(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// The number of elements of an array with `dims`. The product of the
/// nonzero dimensions must fit in `usize`, so every partial product does too.
pub(crate) fn checked_num_elements(dims: &[usize]) -> Result<usize> {
    let nonzero = dims
        .iter()
        .filter(|&&dim| dim > 0)
        .try_fold(1usize, |product, &dim| product.checked_mul(dim));
    ensure!(nonzero.is_some(), "dimensions {:?} are too large", dims);
    Ok(num_elements(dims))
}

fn check_dims(dims: &[usize], len: usize) -> Result<()> {
    ensure!(dims.len() >= 2, "an array needs at least 2 dimensions");
    ensure!(
        checked_num_elements(dims)? == len,
        "dimensions {:?} do not match {} elements",
        dims,
        len
    );
    Ok(())
}

/// A numeric array. Values are stored column-major and widened to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub class: NumericClass,
    dims: Vec<usize>,
    data: Vec<f64>,
}

impl NumericArray {
    pub fn new(class: NumericClass, dims: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        check_dims(&dims, data.len())?;
        Ok(Self { class, dims, data })
    }

    /// Builds a 2-D array from rows of equal length.
    pub fn from_rows<R>(class: NumericClass, rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        let nrows = rows.len();
        let ncols = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        ensure!(
            rows.iter().all(|row| row.as_ref().len() == ncols),
            "rows have different lengths"
        );
        let data: Vec<_> = (0..ncols)
            .flat_map(|col| rows.iter().map(move |row| row.as_ref()[col]))
            .collect();
        Self::new(class, vec![nrows, ncols], data)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The column-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn nrows(&self) -> usize {
        self.dims[0]
    }

    /// The number of columns, with trailing dimensions folded in.
    pub fn ncols(&self) -> usize {
        num_elements(&self.dims[1..])
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let nrows = self.nrows();
        (row < nrows && col < self.ncols()).then(|| self.data[col * nrows + row])
    }

    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        (row < self.nrows()).then(|| {
            (0..self.ncols())
                .map(|col| self.data[col * self.nrows() + row])
                .collect()
        })
    }

    /// Iterates over the rows of a 2-D view.
    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.nrows()).filter_map(move |row| self.row(row))
    }
}

/// A char array holding UTF-16 code units column-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharArray {
    dims: Vec<usize>,
    data: Vec<u16>,
}

impl CharArray {
    pub fn new(dims: Vec<usize>, data: Vec<u16>) -> Result<Self> {
        check_dims(&dims, data.len())?;
        Ok(Self { dims, data })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub(crate) fn code_units(&self) -> &[u16] {
        &self.data
    }

    /// Decodes a single-row char array.
    pub fn text(&self) -> Result<String> {
        ensure!(
            self.dims[0] <= 1 || self.data.is_empty(),
            "expect a single-row char array, but found dimensions {:?}",
            self.dims
        );
        let text = String::from_utf16(&self.data)?;
        Ok(text)
    }
}

impl From<&str> for CharArray {
    fn from(text: &str) -> Self {
        let data: Vec<u16> = text.encode_utf16().collect();
        let dims = if data.is_empty() {
            vec![0, 0]
        } else {
            vec![1, data.len()]
        };
        Self { dims, data }
    }
}

/// A cell array. Cells are stored column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CellArray {
    dims: Vec<usize>,
    cells: Vec<MatValue>,
}

impl CellArray {
    pub fn new(dims: Vec<usize>, cells: Vec<MatValue>) -> Result<Self> {
        check_dims(&dims, cells.len())?;
        Ok(Self { dims, cells })
    }

    /// Builds an N×1 cell array.
    pub fn column(cells: Vec<MatValue>) -> Self {
        Self {
            dims: vec![cells.len(), 1],
            cells,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The cells in column-major order, which is the order of a flattened array.
    pub fn cells(&self) -> &[MatValue] {
        &self.cells
    }
}

/// A struct array. Every element has the same ordered set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    dims: Vec<usize>,
    fields: IndexSet<String>,
    elements: Vec<Vec<MatValue>>,
}

impl StructArray {
    pub fn new(
        dims: Vec<usize>,
        fields: IndexSet<String>,
        elements: Vec<Vec<MatValue>>,
    ) -> Result<Self> {
        check_dims(&dims, elements.len())?;
        ensure!(
            elements.iter().all(|values| values.len() == fields.len()),
            "every struct element must have {} fields",
            fields.len()
        );
        Ok(Self {
            dims,
            fields,
            elements,
        })
    }

    /// Builds a 1×N struct array from named field values. Every element
    /// must list the same fields in the same order.
    pub fn row(elements: Vec<IndexMap<String, MatValue>>) -> Result<Self> {
        let fields: IndexSet<String> = elements
            .first()
            .map(|first| first.keys().cloned().collect())
            .unwrap_or_default();
        let values: Vec<Vec<_>> = elements
            .into_iter()
            .map(|element| -> Result<_> {
                ensure!(
                    element.keys().eq(fields.iter()),
                    "struct elements have different fields"
                );
                Ok(element.into_iter().map(|(_, value)| value).collect())
            })
            .try_collect()?;
        let dims = if values.is_empty() {
            vec![0, 0]
        } else {
            vec![1, values.len()]
        };
        Self::new(dims, fields, values)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn fields(&self) -> &IndexSet<String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The field `name` of the element at `index` (column-major).
    pub fn field(&self, index: usize, name: &str) -> Option<&MatValue> {
        let field_index = self.fields.get_index_of(name)?;
        self.elements.get(index)?.get(field_index)
    }

    pub(crate) fn elements(&self) -> &[Vec<MatValue>] {
        &self.elements
    }
}

/// A loaded array of any supported class.
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    Numeric(NumericArray),
    Char(CharArray),
    Cell(CellArray),
    Struct(StructArray),
}

impl MatValue {
    /// A 1×1 double array.
    pub fn scalar(value: f64) -> Self {
        Self::Numeric(NumericArray {
            class: NumericClass::Double,
            dims: vec![1, 1],
            data: vec![value],
        })
    }

    /// A 1×N double array.
    pub fn row_vector(values: &[f64]) -> Self {
        Self::Numeric(NumericArray {
            class: NumericClass::Double,
            dims: vec![1, values.len()],
            data: values.to_vec(),
        })
    }

    pub fn text(text: &str) -> Self {
        Self::Char(text.into())
    }

    pub fn dims(&self) -> &[usize] {
        match self {
            Self::Numeric(array) => array.dims(),
            Self::Char(array) => array.dims(),
            Self::Cell(array) => array.dims(),
            Self::Struct(array) => array.dims(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Char(_) => "char",
            Self::Cell(_) => "cell",
            Self::Struct(_) => "struct",
        }
    }

    pub fn as_numeric(&self) -> Result<&NumericArray> {
        match self {
            Self::Numeric(array) => Ok(array),
            _ => bail!("expect a numeric array, but found a {} array", self.kind()),
        }
    }

    pub fn as_char(&self) -> Result<&CharArray> {
        match self {
            Self::Char(array) => Ok(array),
            _ => bail!("expect a char array, but found a {} array", self.kind()),
        }
    }

    pub fn as_cell(&self) -> Result<&CellArray> {
        match self {
            Self::Cell(array) => Ok(array),
            _ => bail!("expect a cell array, but found a {} array", self.kind()),
        }
    }

    pub fn as_struct(&self) -> Result<&StructArray> {
        match self {
            Self::Struct(array) => Ok(array),
            _ => bail!("expect a struct array, but found a {} array", self.kind()),
        }
    }
}

impl From<NumericArray> for MatValue {
    fn from(from: NumericArray) -> Self {
        Self::Numeric(from)
    }
}

impl From<CharArray> for MatValue {
    fn from(from: CharArray) -> Self {
        Self::Char(from)
    }
}

impl From<CellArray> for MatValue {
    fn from(from: CellArray) -> Self {
        Self::Cell(from)
    }
}

impl From<StructArray> for MatValue {
    fn from(from: StructArray) -> Self {
        Self::Struct(from)
    }
}
