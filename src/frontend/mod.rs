pub mod input;
pub mod scanner;
pub mod token;
pub mod token_dumper;

pub use input::{InputError, InputStack, MAX_FILE_NESTING};
pub use scanner::Scanner;
pub use token::{Token, TokenKind};
