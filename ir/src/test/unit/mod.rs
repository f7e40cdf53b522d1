mod graph;
mod node;
mod tlu;
mod value;
