use argon2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};
#[cfg(any(test, feature = "test-support"))]
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// OWASP floor for Argon2id: 19 MiB of memory and two passes.
pub const MIN_MEMORY_KIB: u32 = 19 * 1024;
pub const MIN_ITERATIONS: u32 = 2;

/// Filler hashed at construction; verified against when the account is
/// unknown so both failure paths of a login cost one verification.
const DUMMY_PASSWORD: &str = "snippetbox-dummy-password-filler";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password cost too low: {0}")]
    CostTooLow(String),

    #[error("argon2 parameters rejected: {0}")]
    Params(argon2::Error),

    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),

    #[error("stored verifier is malformed: {0}")]
    MalformedVerifier(password_hash::Error),
}

/// Server-wide Argon2id cost. Tune so that one verification takes roughly
/// 100 ms on the deployment hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl PasswordParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        if memory_kib < MIN_MEMORY_KIB {
            return Err(PasswordError::CostTooLow(format!(
                "memory {} KiB is below the minimum of {} KiB",
                memory_kib, MIN_MEMORY_KIB
            )));
        }
        if iterations < MIN_ITERATIONS {
            return Err(PasswordError::CostTooLow(format!(
                "{} iterations is below the minimum of {}",
                iterations, MIN_ITERATIONS
            )));
        }
        if parallelism == 0 {
            return Err(PasswordError::CostTooLow("parallelism must be at least 1".into()));
        }

        Ok(Self {
            memory_kib,
            iterations,
            parallelism,
        })
    }

    /// Cheapest parameters Argon2 accepts. Never use outside tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn fast_insecure() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(PasswordError::Params)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: MIN_MEMORY_KIB,
            iterations: MIN_ITERATIONS,
            parallelism: 1,
        }
    }
}

/// Derives and checks password verifiers (PHC strings).
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy: String,
    #[cfg(any(test, feature = "test-support"))]
    verifications: AtomicUsize,
}

impl PasswordHasher {
    pub fn new(params: PasswordParams) -> Result<Self, PasswordError> {
        let argon2 = params.argon2()?;
        let dummy = hash_with(&argon2, DUMMY_PASSWORD)?;
        Ok(Self {
            argon2,
            dummy,
            #[cfg(any(test, feature = "test-support"))]
            verifications: AtomicUsize::new(0),
        })
    }

    /// Number of Argon2 verifications computed so far, dummy ones included.
    #[cfg(any(test, feature = "test-support"))]
    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::Relaxed)
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash_with(&self.argon2, password)
    }

    /// Returns `Ok(false)` on mismatch; `Err` only when `verifier` cannot be
    /// parsed or the computation itself fails.
    pub fn verify(&self, password: &str, verifier: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(verifier).map_err(PasswordError::MalformedVerifier)?;
        #[cfg(any(test, feature = "test-support"))]
        self.verifications.fetch_add(1, Ordering::Relaxed);
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hash(e)),
        }
    }

    /// Burn one verification against the filler verifier. The outcome is
    /// irrelevant, only the time spent.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy);
    }
}

fn hash_with(argon2: &Argon2<'static>, password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}
