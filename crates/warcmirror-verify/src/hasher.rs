use digest::Digest;

/// Incremental hasher fed one chunk at a time as data streams through.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;

    /// Finalize and render the digest as lowercase hex.
    fn finalize_hex(self) -> String
    where
        Self: Sized,
    {
        hex::encode(self.finalize())
    }
}

/// Adapter over any RustCrypto [`Digest`] implementation.
pub struct DigestHasher<D: Digest + Send>(D);

impl<D: Digest + Send> DigestHasher<D> {
    pub fn new() -> Self {
        Self(D::new())
    }
}

impl<D: Digest + Send> Default for DigestHasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest + Send> Hasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

/// MD5, the digest both Common Crawl and archive.org publish for their files.
#[cfg(feature = "md5")]
pub struct Md5Hasher(md5::Md5);

#[cfg(feature = "md5")]
impl Md5Hasher {
    pub fn new() -> Self {
        Self(md5::Md5::new())
    }

    pub fn digest(data: &[u8]) -> Vec<u8> {
        md5::Md5::digest(data).to_vec()
    }

    pub fn digest_hex(data: &[u8]) -> String {
        hex::encode(Self::digest(data))
    }
}

#[cfg(feature = "md5")]
impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "md5")]
impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

#[cfg(feature = "sha256")]
pub struct Sha256Hasher(sha2::Sha256);

#[cfg(feature = "sha256")]
impl Sha256Hasher {
    pub fn new() -> Self {
        Self(sha2::Sha256::new())
    }

    pub fn digest(data: &[u8]) -> Vec<u8> {
        sha2::Sha256::digest(data).to_vec()
    }
}

#[cfg(feature = "sha256")]
impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "sha256")]
impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}
