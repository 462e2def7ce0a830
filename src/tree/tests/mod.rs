mod bounding;
mod observers;
