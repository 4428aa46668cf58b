//! Exchange of field content with an unstructured-grid consumer (a
//! covariance model, typically) that knows nothing of the mesh.

use nd::prelude::*;

use nac::{Coord, Fields, Scalar};

/// Cell coordinates, a level count, and named `(levels, cells)` slots.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstructuredGrid<E>
  where E: Scalar,
{
  coords: Vec<Coord>,
  levels: usize,
  fields: Vec<(String, Array2<E>)>,
}

impl<E> Default for UnstructuredGrid<E>
  where E: Scalar,
{
  fn default() -> Self { UnstructuredGrid::new() }
}

impl<E> UnstructuredGrid<E>
  where E: Scalar,
{
  pub fn new() -> UnstructuredGrid<E> {
    UnstructuredGrid {
      coords: Vec::new(),
      levels: 0,
      fields: Vec::new(),
    }
  }

  pub fn coords(&self) -> &[Coord] { &self.coords[..] }
  pub fn n_cells(&self) -> usize { self.coords.len() }
  pub fn n_levels(&self) -> usize { self.levels }
  pub fn n_fields(&self) -> usize { self.fields.len() }
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.fields.iter().map(|f| &f.0[..])
  }

  pub fn field(&self, name: &str) -> Option<ArrayView2<E>> {
    self.fields
      .iter()
      .find(|f| f.0 == name)
      .map(|f| f.1.view())
  }
  pub fn field_mut(&mut self, name: &str) -> Option<ArrayViewMut2<E>> {
    self.fields
      .iter_mut()
      .find(|f| f.0 == name)
      .map(|f| f.1.view_mut())
  }

  /// Insert or replace the slot called `name`.
  pub fn set_field(&mut self, name: &str, values: Array2<E>) {
    assert_eq!(values.dim(), (self.levels, self.coords.len()),
               "slot `{}` does not match the grid", name);
    match self.fields.iter().position(|f| f.0 == name) {
      Some(i) => self.fields[i].1 = values,
      None => self.fields.push((name.to_owned(), values)),
    }
  }
}

/// Replace the grid description with the mesh of `fields`. Slots whose
/// shape no longer fits are dropped.
pub(crate) fn coordinates_into<E>(fields: &Fields<E>, ug: &mut UnstructuredGrid<E>)
  where E: Scalar,
{
  let geom = fields.geometry();
  ug.coords.clear();
  ug.coords.extend_from_slice(geom.coords());
  ug.levels = geom.n_levels();
  let shape = (ug.levels, ug.coords.len());
  ug.fields.retain(|f| f.1.dim() == shape);
}

fn assert_same_mesh<E>(fields: &Fields<E>, ug: &UnstructuredGrid<E>)
  where E: Scalar,
{
  let geom = fields.geometry();
  assert!(ug.levels == geom.n_levels() && &ug.coords[..] == geom.coords(),
          "unstructured grid coordinates do not match the mesh");
}

pub(crate) fn field_into<E>(fields: &Fields<E>, ug: &mut UnstructuredGrid<E>, idx: usize)
  where E: Scalar,
{
  assert!(idx < fields.variables().len(),
          "field index {} out of range for [{}]", idx, fields.variables());
  assert_same_mesh(fields, ug);
  let name = &fields.variables().names()[idx];
  ug.set_field(name, fields.field_at(idx).to_owned());
}

pub(crate) fn field_from<E>(fields: &mut Fields<E>, ug: &UnstructuredGrid<E>, idx: usize)
  where E: Scalar,
{
  assert!(idx < fields.variables().len(),
          "field index {} out of range for [{}]", idx, fields.variables());
  assert_same_mesh(fields, ug);
  let name = fields.variables().names()[idx].clone();
  match ug.field(&name) {
    Some(src) => fields.field_at_mut(idx).assign(&src),
    None => panic!("unstructured grid holds no field `{}`", name),
  }
}
