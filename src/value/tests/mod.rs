mod merge;
mod ordering;
