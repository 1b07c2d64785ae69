mod generate_docs;
mod parse_generic;
mod support;
