//! OpenCL kernel source generation (spec §4.7).
//!
//! No `.cl` files exist anywhere to borrow from, so the kernel body is
//! carried as a static Rust string constant and the per-pattern
//! `#define` prelude is generated and prepended, the same
//! build-a-program-from-a-source-string approach the teacher uses in
//! `src/miner.rs` (`ProgramBuilder::src(...)`), just with the source
//! string assembled instead of hand-written.

use crate::pattern::Pattern;

pub const KERNEL_NAME: &str = "bruteforce";

/// The part of the kernel that doesn't vary per pattern: the
/// mixed-radix reconstruction of a work-item's counts, the resumable
/// `hashlittle2` mix/final-mix (ported line-for-line from `hash.rs`),
/// and the dense bucket lookup against `bucket_hashes`.
const KERNEL_BODY: &str = r#"
#define ROTL32(x, r) rotate((uint)(x), (uint)(r))

inline void mix(uint *a, uint *b, uint *c) {
    *a -= *c; *a ^= ROTL32(*c, 4);  *c += *b;
    *b -= *a; *b ^= ROTL32(*a, 6);  *a += *c;
    *c -= *b; *c ^= ROTL32(*b, 8);  *b += *a;
    *a -= *c; *a ^= ROTL32(*c, 16); *c += *b;
    *b -= *a; *b ^= ROTL32(*a, 19); *a += *c;
    *c -= *b; *c ^= ROTL32(*b, 4);  *b += *a;
}

inline void final_mix(uint *a, uint *b, uint *c) {
    *c ^= *b; *c -= ROTL32(*b, 14);
    *a ^= *c; *a -= ROTL32(*c, 11);
    *b ^= *a; *b -= ROTL32(*a, 25);
    *c ^= *b; *c -= ROTL32(*b, 16);
    *a ^= *c; *a -= ROTL32(*c, 4);
    *b ^= *a; *b -= ROTL32(*a, 14);
    *c ^= *b; *c -= ROTL32(*b, 24);
}

inline uint read_u32_le(const uchar *p) {
    return (uint)p[0] | ((uint)p[1] << 8) | ((uint)p[2] << 16) | ((uint)p[3] << 24);
}

inline bool bucket_lookup(ulong h, __global const ulong *bucket_hashes) {
    ulong base = (ulong)BUCKET_SIZE * (h & BUCKET_MASK);
    for (uint j = 0; j < BUCKET_SIZE; j++) {
        ulong slot = bucket_hashes[base + j];
        if (slot == 0) return false;
        if (slot == h) return true;
    }
    return false;
}

__kernel void bruteforce(
    __global const ulong *initial_counts,
    __global uint *num_results,
    __global ulong *results,
    __global const ulong *bucket_hashes)
{
    size_t g = get_global_id(0);

    ulong counts[NUM_INDICES > 0 ? NUM_INDICES : 1];
    for (int i = 0; i < NUM_INDICES; i++) counts[i] = initial_counts[i];

    ulong inc = (ulong)g;
    counts[0] += inc;
    for (int i = 0; i < NUM_INDICES; i++) {
        if (counts[i] >= NUM_LETTERS) {
            ulong carry = counts[i] / NUM_LETTERS;
            counts[i] = counts[i] % NUM_LETTERS;
            if (i + 1 >= NUM_INDICES) return; // carried past the top digit
            counts[i + 1] += carry;
        }
    }

    __constant uchar letters[] = LETTERS;
    // Sized by its own initializer (padded-tail length), not LEN: LEN is
    // the logical remaining length, which the padding can exceed by up
    // to 11 bytes, and reading past STR's own length is undefined.
    uchar tail[] = STR;

    int indices[NUM_INDICES > 0 ? NUM_INDICES : 1] = INDICES;
#if NUM_INDICES2 > 0
    int indices2[NUM_INDICES2] = INDICES2;
#endif
    for (int i = 0; i < NUM_INDICES; i++) {
        uchar letter = letters[counts[i]];
        tail[indices[i]] = letter;
#if NUM_INDICES2 > 0
        if (i < NUM_INDICES2) tail[indices2[i]] = letter;
#endif
    }

    uint a = A, b = B, c = C;
    int remaining = LEN;
    const uchar *k = tail;
    while (remaining > 12) {
        a += read_u32_le(k);
        b += read_u32_le(k + 4);
        c += read_u32_le(k + 8);
        mix(&a, &b, &c);
        k += 12;
        remaining -= 12;
    }
    a += read_u32_le(k);
    b += read_u32_le(k + 4);
    c += read_u32_le(k + 8);
    final_mix(&a, &b, &c);

    ulong digest = ((ulong)c << 32) | (ulong)b;
    if (digest != 0 && bucket_lookup(digest, bucket_hashes)) {
        uint slot = atomic_inc(num_results);
        if (slot < MAX_RESULTS) {
            results[slot] = (ulong)g;
        }
    }
}
"#;

/// Build the full program source for `pattern`: a `#define` prelude
/// (spec §4.7's exact definition list) followed by the static kernel
/// body.
pub fn generate_source(pattern: &Pattern, bucket_size: usize, max_results: u32) -> String {
    let hash_string = &pattern.hash_string;
    let offset = hash_string.offset();
    let padded = hash_string.padded_bytes();
    let tail = &padded[offset..];
    // LEN excludes the trailing 12-byte finalisation block the kernel
    // always re-reads separately (matches hash.rs's own `remaining`
    // bookkeeping).
    let len = hash_string.len() - offset;

    let letters_quoted: String = pattern
        .alphabet
        .as_slice()
        .iter()
        .map(|&b| b as char)
        .collect();
    let str_bytes: String = tail
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let indices: String = pattern
        .primary_indices
        .iter()
        .map(|&i| (i - offset).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let indices2: String = pattern
        .secondary_indices
        .iter()
        .map(|&i| (i - offset).to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let (a, b, c) = if offset > 0 {
        hash_string.state()
    } else {
        let seed = 0xdeadbeefu32.wrapping_add(hash_string.len() as u32);
        (seed, seed, seed)
    };

    let mut prelude = String::new();
    prelude.push_str(&format!("#define NUM_LETTERS {}\n", pattern.alphabet.len()));
    prelude.push_str(&format!("#define LETTERS \"{letters_quoted}\"\n"));
    prelude.push_str(&format!("#define STR {{{str_bytes}}}\n"));
    prelude.push_str(&format!("#define LEN {len}\n"));
    prelude.push_str(&format!("#define NUM_INDICES {}\n", pattern.primary_indices.len()));
    prelude.push_str(&format!("#define NUM_INDICES2 {}\n", pattern.secondary_indices.len()));
    prelude.push_str(&format!("#define INDICES {{{indices}}}\n"));
    prelude.push_str(&format!("#define INDICES2 {{{indices2}}}\n"));
    prelude.push_str(&format!("#define A {a}u\n"));
    prelude.push_str(&format!("#define B {b}u\n"));
    prelude.push_str(&format!("#define C {c}u\n"));
    prelude.push_str("#define BUCKET_MASK 0xFFFFUL\n");
    prelude.push_str(&format!("#define BUCKET_SIZE {bucket_size}\n"));
    prelude.push_str(&format!("#define NUM_HASHES {}\n", bucket_size * 0x1_0000));
    prelude.push_str(&format!("#define MAX_RESULTS {max_results}\n"));

    format!("{prelude}\n{KERNEL_BODY}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    #[test]
    fn prelude_embeds_every_define_the_contract_requires() {
        let pattern = Pattern::new("A*C", Alphabet::parse("hex"));
        let source = generate_source(&pattern, 4, 1024);
        for define in [
            "NUM_LETTERS", "LETTERS", "STR", "LEN", "NUM_INDICES", "NUM_INDICES2",
            "INDICES", "INDICES2", "A ", "B ", "C ", "BUCKET_MASK", "BUCKET_SIZE",
            "NUM_HASHES", "MAX_RESULTS",
        ] {
            assert!(source.contains(define), "missing #define {define}");
        }
        assert!(source.contains("__kernel void bruteforce"));
    }

    #[test]
    fn indices_are_rebased_to_subtract_the_precomputed_offset() {
        // 13 fixed chars then a wildcard -> offset == 12 (see hash_string tests)
        let pattern = Pattern::new("ABCDEFGHIJKLM*", Alphabet::parse("hex"));
        assert_eq!(pattern.hash_string.offset(), 12);
        let source = generate_source(&pattern, 1, 1024);
        assert!(source.contains("#define INDICES {1}"));
    }
}
