//! JSON field files: valid time, variables, shape and the raw array.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use nd::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IoConfig;
use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::variables::Variables;
use crate::{Scalar, ValidTime};

#[derive(Serialize)]
struct FieldFileRef<'a, E>
  where E: Scalar,
{
  valid_time: &'a ValidTime,
  variables: &'a Variables,
  levels: usize,
  cells: usize,
  data: ArrayView3<'a, E>,
}

#[derive(Deserialize)]
#[serde(bound = "E: Scalar")]
struct FieldFile<E>
  where E: Scalar,
{
  valid_time: ValidTime,
  variables: Variables,
  levels: usize,
  cells: usize,
  data: Array3<E>,
}

pub fn write_fields<E>(fields: &Fields<E>, time: &ValidTime,
                       config: &IoConfig) -> Result<()>
  where E: Scalar,
{
  let geom = fields.geometry();
  let file = FieldFileRef {
    valid_time: time,
    variables: fields.variables(),
    levels: geom.n_levels(),
    cells: geom.n_cells(),
    data: fields.data(),
  };

  let mut w = BufWriter::new(File::create(&config.filename)?);
  serde_json::to_writer(&mut w, &file)?;
  w.flush()?;
  debug!(file = %config.filename.display(), "wrote fields");
  Ok(())
}

/// Fill `fields` from the file and return the file's valid time. The file
/// may hold more variables than `fields`; it must hold all of them.
pub fn read_fields<E>(fields: &mut Fields<E>, config: &IoConfig) -> Result<ValidTime>
  where E: Scalar,
{
  let r = BufReader::new(File::open(&config.filename)?);
  let file: FieldFile<E> = serde_json::from_reader(r)?;

  let expected = {
    let geom = fields.geometry();
    (geom.n_levels(), geom.n_cells())
  };
  let (nv, nl, nc) = file.data.dim();
  if (file.levels, file.cells) != expected || (nl, nc) != expected {
    return Err(Error::ShapeMismatch {
      expected,
      found: (nl, nc),
    });
  }
  if nv != file.variables.len() {
    return Err(Error::config(format!("{} declares {} variables but holds {}",
                                     config.filename.display(),
                                     file.variables.len(), nv)));
  }

  let wanted: Vec<(usize, usize)> = fields.variables()
    .iter()
    .enumerate()
    .map(|(dst, name)| {
      file.variables
        .index_of(name)
        .map(|src| (dst, src))
        .ok_or_else(|| Error::UnknownVariable(name.clone()))
    })
    .collect::<Result<_>>()?;
  for (dst, src) in wanted {
    fields.field_at_mut(dst).assign(&file.data.index_axis(Axis(0), src));
  }

  debug!(file = %config.filename.display(), time = %file.valid_time, "read fields");
  Ok(file.valid_time)
}
