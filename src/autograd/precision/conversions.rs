//! Precision conversion functions.

/// Convert f32 to bf16 (truncated)
///
/// BF16 uses the same exponent as f32 but only 7 mantissa bits.
pub fn f32_to_bf16(value: f32) -> u16 {
    let bits = value.to_bits();
    if value.is_nan() {
        // Keep a mantissa bit set so truncation cannot turn NaN into Inf.
        return ((bits >> 16) as u16) | 0x0040;
    }
    // Take upper 16 bits (sign + exponent + 7 mantissa bits)
    (bits >> 16) as u16
}

/// Convert bf16 to f32
pub fn bf16_to_f32(value: u16) -> f32 {
    // Place in upper 16 bits, lower 16 are zeros
    let bits = u32::from(value) << 16;
    f32::from_bits(bits)
}

/// Convert f32 to fp16 (IEEE half precision), rounding to nearest even.
pub fn f32_to_fp16(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exp = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exp == 0xff {
        // Inf or NaN
        let payload = if mantissa != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | payload;
    }

    let unbiased = exp - 127;
    if unbiased > 15 {
        // Overflows half range
        return sign | 0x7c00;
    }

    if unbiased >= -14 {
        // Normal half
        let half_exp = ((unbiased + 15) as u16) << 10;
        let mut half = sign | half_exp | (mantissa >> 13) as u16;
        let round_bits = mantissa & 0x1fff;
        // Rounding may carry into the exponent, which is still correct.
        if round_bits > 0x1000 || (round_bits == 0x1000 && (half & 1) == 1) {
            half += 1;
        }
        return half;
    }

    if unbiased >= -24 {
        // Subnormal half
        let m = mantissa | 0x0080_0000;
        let shift = (-unbiased - 1) as u32;
        let mut half = (m >> shift) as u16;
        let rem = m & ((1u32 << shift) - 1);
        let halfway = 1u32 << (shift - 1);
        if rem > halfway || (rem == halfway && (half & 1) == 1) {
            half += 1;
        }
        return sign | half;
    }

    // Underflows to signed zero
    sign
}

/// Convert fp16 to f32
pub fn fp16_to_f32(value: u16) -> f32 {
    let sign = u32::from(value & 0x8000) << 16;
    let exp = (value >> 10) & 0x1f;
    let mantissa = u32::from(value & 0x03ff);

    let bits = match exp {
        0 => {
            if mantissa == 0 {
                sign
            } else {
                // Subnormal: renormalize into an f32 exponent
                let mut exp32: u32 = 113;
                let mut m = mantissa;
                while m & 0x0400 == 0 {
                    m <<= 1;
                    exp32 -= 1;
                }
                sign | (exp32 << 23) | ((m & 0x03ff) << 13)
            }
        }
        0x1f => sign | 0x7f80_0000 | (mantissa << 13),
        _ => sign | ((u32::from(exp) + 112) << 23) | (mantissa << 13),
    };
    f32::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp16_round_trip_exact_values() {
        for &v in &[0.0f32, 1.0, -1.0, 0.5, 2.0, 1024.0, -0.25, 65504.0] {
            assert_eq!(fp16_to_f32(f32_to_fp16(v)), v);
        }
    }

    #[test]
    fn test_fp16_overflow_to_infinity() {
        assert_eq!(fp16_to_f32(f32_to_fp16(1e10)), f32::INFINITY);
        assert_eq!(fp16_to_f32(f32_to_fp16(-1e10)), f32::NEG_INFINITY);
    }

    #[test]
    fn test_fp16_underflow_to_zero() {
        assert_eq!(fp16_to_f32(f32_to_fp16(1e-10)), 0.0);
    }

    #[test]
    fn test_fp16_subnormal_round_trip() {
        // Smallest positive half subnormal is 2^-24.
        let tiny = 2.0f32.powi(-24);
        assert_eq!(fp16_to_f32(f32_to_fp16(tiny)), tiny);
    }

    #[test]
    fn test_fp16_nan_preserved() {
        assert!(fp16_to_f32(f32_to_fp16(f32::NAN)).is_nan());
    }

    #[test]
    fn test_fp16_rounds_to_nearest() {
        // 1.0 + 2^-11 is exactly halfway between two halves; nearest-even
        // rounds it down to 1.0.
        let v = 1.0 + 2.0f32.powi(-11);
        assert_eq!(fp16_to_f32(f32_to_fp16(v)), 1.0);
    }

    #[test]
    fn test_bf16_round_trip_exact_values() {
        for &v in &[0.0f32, 1.0, -2.0, 0.5, 128.0] {
            assert_eq!(bf16_to_f32(f32_to_bf16(v)), v);
        }
    }

    #[test]
    fn test_bf16_truncates_mantissa() {
        let v = 1.0 + 2.0f32.powi(-9);
        assert_eq!(bf16_to_f32(f32_to_bf16(v)), 1.0);
    }

    #[test]
    fn test_bf16_nan_preserved() {
        assert!(bf16_to_f32(f32_to_bf16(f32::NAN)).is_nan());
    }

    #[test]
    fn test_bf16_keeps_large_range() {
        let v = 1e30f32;
        let back = bf16_to_f32(f32_to_bf16(v));
        assert!(back.is_finite());
        assert!((back - v).abs() / v < 0.01);
    }
}
