use crate::{common::*, element::*, value::*};

type LE = LittleEndian;

const HEADER_TEXT: &str = "MATLAB 5.0 MAT-file, written by mat-file";

pub(crate) fn write_file(variables: &IndexMap<String, MatValue>) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE);

    // header
    let mut text = HEADER_TEXT.as_bytes().to_vec();
    text.resize(HEADER_TEXT_SIZE, b' ');
    bytes.extend(text);
    bytes.extend_from_slice(&[0; 8]);
    bytes.write_u16::<LE>(VERSION)?;
    bytes.extend_from_slice(b"IM");

    for (name, value) in variables {
        ensure!(!name.is_empty(), "a top-level variable must have a name");
        write_matrix(&mut bytes, name, value)?;
    }

    Ok(bytes)
}

fn write_element(out: &mut Vec<u8>, data_type: u32, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| format_err!("data element of {} bytes is too large", data.len()))?;
    out.write_u32::<LE>(data_type)?;
    out.write_u32::<LE>(len)?;
    out.extend_from_slice(data);
    out.resize(out.len() + padded_len(data.len()) - data.len(), 0);
    Ok(())
}

fn write_matrix(out: &mut Vec<u8>, name: &str, value: &MatValue) -> Result<()> {
    let mut body = vec![];

    let class = match value {
        MatValue::Numeric(array) => array.class.code(),
        MatValue::Char(_) => MX_CHAR,
        MatValue::Cell(_) => MX_CELL,
        MatValue::Struct(_) => MX_STRUCT,
    };

    // array flags
    {
        let mut flags = vec![];
        flags.write_u32::<LE>(class as u32)?;
        flags.write_u32::<LE>(0)?;
        write_element(&mut body, MI_UINT32, &flags)?;
    }

    // dimensions
    {
        let mut dims = vec![];
        for &dim in value.dims() {
            let dim = i32::try_from(dim).map_err(|_| format_err!("dimension {} is too large", dim))?;
            dims.write_i32::<LE>(dim)?;
        }
        write_element(&mut body, MI_INT32, &dims)?;
    }

    write_element(&mut body, MI_INT8, name.as_bytes())?;

    match value {
        MatValue::Numeric(array) => {
            let data = encode_numbers(array.class, array.data())?;
            write_element(&mut body, array.class.data_type(), &data)?;
        }
        MatValue::Char(array) => {
            let mut data = vec![];
            for &unit in array.code_units() {
                data.write_u16::<LE>(unit)?;
            }
            write_element(&mut body, MI_UINT16, &data)?;
        }
        MatValue::Cell(array) => {
            for cell in array.cells() {
                write_matrix(&mut body, "", cell)?;
            }
        }
        MatValue::Struct(array) => {
            let name_len = array
                .fields()
                .iter()
                .map(|field| field.len() + 1)
                .max()
                .unwrap_or(1);

            let mut name_len_data = vec![];
            name_len_data.write_i32::<LE>(name_len as i32)?;
            write_element(&mut body, MI_INT32, &name_len_data)?;

            let mut names = vec![];
            for field in array.fields() {
                let begin = names.len();
                names.extend_from_slice(field.as_bytes());
                names.resize(begin + name_len, 0);
            }
            write_element(&mut body, MI_INT8, &names)?;

            for values in array.elements() {
                for value in values {
                    write_matrix(&mut body, "", value)?;
                }
            }
        }
    }

    write_element(out, MI_MATRIX, &body)
}

fn encode_numbers(class: NumericClass, values: &[f64]) -> Result<Vec<u8>> {
    let mut data = vec![];
    for &value in values {
        match class {
            NumericClass::Double => data.write_f64::<LE>(value)?,
            NumericClass::Single => data.write_f32::<LE>(value as f32)?,
            NumericClass::Int8 => data.write_i8(value as i8)?,
            NumericClass::UInt8 => data.write_u8(value as u8)?,
            NumericClass::Int16 => data.write_i16::<LE>(value as i16)?,
            NumericClass::UInt16 => data.write_u16::<LE>(value as u16)?,
            NumericClass::Int32 => data.write_i32::<LE>(value as i32)?,
            NumericClass::UInt32 => data.write_u32::<LE>(value as u32)?,
            NumericClass::Int64 => data.write_i64::<LE>(value as i64)?,
            NumericClass::UInt64 => data.write_u64::<LE>(value as u64)?,
        }
    }
    Ok(data)
}
