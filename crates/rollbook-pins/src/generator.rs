//! Candidate code generation.

use rand::Rng;

/// Symbols a code is drawn from.
pub const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces candidate codes. Candidates are not checked for uniqueness here.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

impl<F> CodeGenerator for F
where
    F: Fn(usize) -> String + Send + Sync,
{
    fn generate(&self, length: usize) -> String {
        self(length)
    }
}

/// Uniform draw over [`ALPHABET`] from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// True if `code` has the given length and only uses [`ALPHABET`] symbols.
pub fn is_well_formed(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| ALPHABET.contains(&b))
}
