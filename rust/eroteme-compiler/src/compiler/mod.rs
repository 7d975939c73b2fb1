pub mod align;
pub mod ast;
pub mod directives;
pub mod emit;
pub mod lexer;
pub mod locate;
pub mod parser;
pub mod synth;
pub mod tokens;
