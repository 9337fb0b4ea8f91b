//! Conversion of numeric arrays to and from JSON.
//!
//! Arrays are exported either in the native `ndarray` serde form (`keep_arrays = true`)
//! or as plain nested lists. Import accepts both forms.

use crate::errors::{CipherError, CipherResult};
use ndarray::{Array, Array2, ArrayD, ArrayViewD, Dimension, IxDyn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub fn array_to_json<A, D>(array: &Array<A, D>, keep_arrays: bool) -> CipherResult<Value>
where
    A: Serialize,
    D: Dimension + Serialize,
{
    if keep_arrays {
        Ok(serde_json::to_value(array)?)
    } else {
        nested_list(array.view().into_dyn())
    }
}

fn nested_list<A: Serialize>(view: ArrayViewD<'_, A>) -> CipherResult<Value> {
    match view.ndim() {
        0 => Ok(view
            .iter()
            .next()
            .map(serde_json::to_value)
            .transpose()?
            .unwrap_or(Value::Null)),
        1 => Ok(Value::Array(
            view.iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
        )),
        _ => Ok(Value::Array(
            view.outer_iter()
                .map(nested_list)
                .collect::<CipherResult<_>>()?,
        )),
    }
}

/// Read an array from either its native serde form or nested lists.
pub fn array_from_json<A>(value: &Value) -> CipherResult<ArrayD<A>>
where
    A: DeserializeOwned,
{
    if value.is_object() {
        return Ok(serde_json::from_value(value.clone())?);
    }

    let mut shape = Vec::new();
    let mut flat = Vec::new();
    flatten_nested(value, 0, &mut shape, &mut flat)?;
    ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|e| {
        CipherError::ArrayShape {
            details: format!("nested list is not a regular array: {e}"),
        }
    })
}

/// Read a two-dimensional array, treating an empty list as `(0, ncols_if_empty)`.
pub fn array2_from_json<A>(value: &Value, ncols_if_empty: usize) -> CipherResult<Array2<A>>
where
    A: DeserializeOwned,
{
    let array = array_from_json::<A>(value)?;
    if array.is_empty() && array.ndim() == 1 {
        return Array2::from_shape_vec((0, ncols_if_empty), Vec::new())
            .map_err(|e| CipherError::ArrayShape {
                details: e.to_string(),
            });
    }
    array
        .into_dimensionality()
        .map_err(|e| CipherError::ArrayShape {
            details: format!("expected a two-dimensional array: {e}"),
        })
}

fn flatten_nested<A: DeserializeOwned>(
    value: &Value,
    depth: usize,
    shape: &mut Vec<usize>,
    flat: &mut Vec<A>,
) -> CipherResult<()> {
    match value {
        Value::Array(items) => {
            if shape.len() == depth {
                shape.push(items.len());
            } else if shape.get(depth) != Some(&items.len()) {
                return Err(ragged());
            }
            for item in items {
                flatten_nested(item, depth + 1, shape, flat)?;
            }
            Ok(())
        }
        scalar => {
            if shape.len() != depth {
                return Err(ragged());
            }
            flat.push(serde_json::from_value(scalar.clone())?);
            Ok(())
        }
    }
}

fn ragged() -> CipherError {
    CipherError::ArrayShape {
        details: "nested list is ragged".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nested_list_form() {
        let arr = array![[1usize, 2], [3, 4], [5, 6]];
        let value = array_to_json(&arr, false).unwrap();
        assert_eq!(value, serde_json::json!([[1, 2], [3, 4], [5, 6]]));

        let back: Array2<usize> = array2_from_json(&value, 2).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn test_native_form() {
        let arr = array![[0.5, 1.5], [2.5, 3.5]];
        let value = array_to_json(&arr, true).unwrap();
        assert!(value.is_object());

        let back: Array2<f64> = array2_from_json(&value, 2).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn test_empty_pairs() {
        let value = serde_json::json!([]);
        let back: Array2<usize> = array2_from_json(&value, 2).unwrap();
        assert_eq!(back.shape(), &[0, 2]);
    }

    #[test]
    fn test_ragged() {
        let value = serde_json::json!([[1, 2], [3]]);
        assert!(matches!(
            array_from_json::<usize>(&value),
            Err(CipherError::ArrayShape { .. })
        ));
        let value = serde_json::json!([[[1, 2]], [[3, 4]]]);
        assert!(matches!(
            array2_from_json::<usize>(&value, 2),
            Err(CipherError::ArrayShape { .. })
        ));
    }
}
