//! Run-length compression of the bytecode body.
//!
//! The encoding is `(count: u8, byte)` pairs, with runs longer than
//! 0xFF split. Bytecode is full of zero padding, so this usually pays
//! for itself; when it does not, the caller keeps the original and tags
//! the output as uncompressed.

/// Compress `original`, reporting whether compression was used.
///
/// The compressed form is only returned when it is strictly shorter
/// than the input; otherwise the input comes back unchanged with
/// `false`.
pub fn compress(original: &[u8]) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(original.len());
    let mut run: Option<(u8, usize)> = None;
    for &byte in original {
        run = match run {
            Some((current, count)) if current == byte => Some((current, count + 1)),
            Some((current, count)) => {
                push_run(&mut out, current, count);
                Some((byte, 1))
            }
            None => Some((byte, 1)),
        };
    }
    if let Some((byte, count)) = run {
        push_run(&mut out, byte, count);
    }

    if out.len() >= original.len() {
        (original.to_vec(), false)
    } else {
        (out, true)
    }
}

/// Emit one run, splitting counts that do not fit in a byte.
fn push_run(out: &mut Vec<u8>, byte: u8, mut count: usize) {
    while count > 0xFF {
        out.push(0xFF);
        out.push(byte);
        count -= 0xFF;
    }
    out.push(count as u8);
    out.push(byte);
}

/// Expand a compressed stream back into the original bytes.
pub fn decompress(compressed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(compressed.len() * 2);
    for pair in compressed.chunks_exact(2) {
        let (count, byte) = (pair[0], pair[1]);
        out.extend(std::iter::repeat(byte).take(count as usize));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetitive_input_compresses() {
        let input = [0u8; 64];
        let (compressed, used) = compress(&input);
        assert!(used);
        assert_eq!(compressed, vec![64, 0]);
    }

    #[test]
    fn incompressible_input_is_returned_unchanged() {
        let input: Vec<u8> = (0..=255).collect();
        let (out, used) = compress(&input);
        assert!(!used);
        assert_eq!(out, input);
    }

    #[test]
    fn long_runs_are_split_at_0xff() {
        let input = [7u8; 0x1FF];
        let (compressed, used) = compress(&input);
        assert!(used);
        assert_eq!(compressed, vec![0xFF, 7, 0xFF, 7, 1, 7]);
    }

    #[test]
    fn roundtrip_restores_the_input() {
        let inputs: [&[u8]; 4] = [
            b"",
            b"aaaabbbccd",
            &[0; 300],
            &[1, 1, 2, 2, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0],
        ];
        for input in inputs {
            let (compressed, used) = compress(input);
            if used {
                assert_eq!(decompress(&compressed), input);
            } else {
                assert_eq!(compressed, input);
            }
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        let (out, used) = compress(b"");
        assert!(!used);
        assert!(out.is_empty());
    }
}
