use bytes::Bytes;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// PNG signature padded with zeros to `len` bytes.
pub fn png_bytes(len: usize) -> Bytes {
    let mut data = vec![0u8; len.max(PNG_SIGNATURE.len())];
    data[..PNG_SIGNATURE.len()].copy_from_slice(&PNG_SIGNATURE);
    Bytes::from(data)
}

pub fn pdf_bytes() -> Bytes {
    Bytes::from_static(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n")
}
