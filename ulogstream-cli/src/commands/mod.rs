pub mod chunk;
pub mod inspect;
pub mod reassemble;
