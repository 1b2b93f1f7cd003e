// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Fixed-width images of numbers and dates.

use rowkey_core::{Result, error::diagnostic::codec::CodecError, netbuf::NetWriter, return_error};

use crate::Value;

const FLT_EXP_DIG: u32 = 8;
const DBL_EXP_DIG: u32 = 11;
const NEWDATE_MAX: u64 = (1 << 24) - 1;

fn out_of_range(column: &str, value: &Value) -> CodecError {
	CodecError::ValueOutOfRange {
		column: column.to_string(),
		value: value.to_string(),
	}
}

fn mismatch(column: &str, expected: &'static str) -> CodecError {
	CodecError::TypeMismatch {
		column: column.to_string(),
		expected,
	}
}

/// Big-endian image; signed values get their sign bit flipped so negatives
/// sort first.
pub(super) fn pack_integer(column: &str, value: &Value, width: usize, unsigned: bool, out: &mut NetWriter) -> Result<()> {
	let bits = (width * 8) as u32;
	let raw = if unsigned {
		let v = match value {
			Value::UInt(v) => *v,
			Value::Int(v) if *v >= 0 => *v as u64,
			Value::Int(_) => return Err(out_of_range(column, value).into()),
			_ => return Err(mismatch(column, "unsigned integer").into()),
		};
		if bits < 64 && v >> bits != 0 {
			return Err(out_of_range(column, value).into());
		}
		v
	} else {
		let v = match value {
			Value::Int(v) => *v,
			Value::UInt(v) if *v <= i64::MAX as u64 => *v as i64,
			Value::UInt(_) => return Err(out_of_range(column, value).into()),
			_ => return Err(mismatch(column, "integer").into()),
		};
		if bits < 64 {
			let limit = 1i64 << (bits - 1);
			if v < -limit || v >= limit {
				return Err(out_of_range(column, value).into());
			}
		}
		v as u64
	};

	let bytes = raw.to_be_bytes();
	let image = &bytes[8 - width..];
	out.write_u8(if unsigned { image[0] } else { image[0] ^ 0x80 });
	out.write(&image[1..]);
	Ok(())
}

pub(super) fn unpack_integer(image: &[u8], unsigned: bool) -> Value {
	let width = image.len();
	if unsigned {
		let mut raw = [0u8; 8];
		raw[8 - width..].copy_from_slice(image);
		return Value::UInt(u64::from_be_bytes(raw));
	}
	let lead = image[0] ^ 0x80;
	let mut raw = [if lead & 0x80 != 0 { 0xff } else { 0 }; 8];
	raw[8 - width] = lead;
	raw[9 - width..].copy_from_slice(&image[1..]);
	Value::Int(i64::from_be_bytes(raw))
}

/// Reorders an IEEE-754 big-endian image so that byte order equals numeric
/// order. Zero of either sign collapses to `0x80 00..`.
fn float_sort_image(bytes: &mut [u8], exp_dig: u32) {
	if bytes[0] & 0x80 != 0 {
		for b in bytes.iter_mut() {
			*b ^= 0xff;
		}
	} else {
		let exp = (u16::from_be_bytes([bytes[0], bytes[1]]) | 0x8000).wrapping_add(1 << (15 - exp_dig));
		bytes[..2].copy_from_slice(&exp.to_be_bytes());
	}
}

fn float_from_sort_image(bytes: &mut [u8], exp_dig: u32) {
	if bytes[0] & 0x80 != 0 {
		let exp = (u16::from_be_bytes([bytes[0], bytes[1]]) & 0x7fff).wrapping_sub(1 << (15 - exp_dig));
		bytes[..2].copy_from_slice(&exp.to_be_bytes());
	} else {
		for b in bytes.iter_mut() {
			*b ^= 0xff;
		}
	}
}

fn is_zero_image(image: &[u8]) -> bool {
	image[0] == 0x80 && image[1..].iter().all(|b| *b == 0)
}

pub(super) fn pack_float(column: &str, value: &Value, out: &mut NetWriter) -> Result<()> {
	let v = match value {
		Value::Float(v) => *v,
		_ => return_error!(mismatch(column, "float")),
	};
	if v.is_nan() || v.is_infinite() {
		return_error!(out_of_range(column, value));
	}
	if v == 0.0 {
		out.write(&[0x80, 0, 0, 0]);
		return Ok(());
	}
	let mut bytes = v.to_be_bytes();
	float_sort_image(&mut bytes, FLT_EXP_DIG);
	out.write(&bytes);
	Ok(())
}

pub(super) fn unpack_float(image: &[u8]) -> Value {
	if is_zero_image(image) {
		return Value::Float(0.0);
	}
	let mut bytes = [0u8; 4];
	bytes.copy_from_slice(image);
	float_from_sort_image(&mut bytes, FLT_EXP_DIG);
	Value::Float(f32::from_be_bytes(bytes))
}

pub(super) fn pack_double(column: &str, value: &Value, out: &mut NetWriter) -> Result<()> {
	let v = match value {
		Value::Double(v) => *v,
		Value::Float(v) => *v as f64,
		_ => return_error!(mismatch(column, "double")),
	};
	if v.is_nan() || v.is_infinite() {
		return_error!(out_of_range(column, value));
	}
	if v == 0.0 {
		out.write(&[0x80, 0, 0, 0, 0, 0, 0, 0]);
		return Ok(());
	}
	let mut bytes = v.to_be_bytes();
	float_sort_image(&mut bytes, DBL_EXP_DIG);
	out.write(&bytes);
	Ok(())
}

pub(super) fn unpack_double(image: &[u8]) -> Value {
	if is_zero_image(image) {
		return Value::Double(0.0);
	}
	let mut bytes = [0u8; 8];
	bytes.copy_from_slice(image);
	float_from_sort_image(&mut bytes, DBL_EXP_DIG);
	Value::Double(f64::from_be_bytes(bytes))
}

/// DATE travels as its packed day number `year*512 + month*32 + day`.
pub(super) fn pack_newdate(column: &str, value: &Value, out: &mut NetWriter) -> Result<()> {
	let v = match value {
		Value::UInt(v) => *v,
		Value::Int(v) if *v >= 0 => *v as u64,
		_ => return_error!(mismatch(column, "packed date")),
	};
	if v > NEWDATE_MAX {
		return_error!(out_of_range(column, value));
	}
	out.write(&v.to_be_bytes()[5..]);
	Ok(())
}

pub(super) fn unpack_newdate(image: &[u8]) -> Value {
	Value::UInt(((image[0] as u64) << 16) | ((image[1] as u64) << 8) | image[2] as u64)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn int_image(value: i64, width: usize) -> Vec<u8> {
		let mut out = NetWriter::new();
		pack_integer("c", &Value::Int(value), width, false, &mut out).unwrap();
		out.into_inner()
	}

	fn double_image(value: f64) -> Vec<u8> {
		let mut out = NetWriter::new();
		pack_double("c", &Value::Double(value), &mut out).unwrap();
		out.into_inner()
	}

	#[test]
	fn test_signed_int_images() {
		assert_eq!(int_image(1, 4), vec![0x80, 0, 0, 1]);
		assert_eq!(int_image(-1, 4), vec![0x7f, 0xff, 0xff, 0xff]);
		assert_eq!(int_image(0, 1), vec![0x80]);
		assert_eq!(int_image(-8_388_608, 3), vec![0x00, 0x00, 0x00]);
	}

	#[test]
	fn test_signed_int_order() {
		let values = [i64::MIN, -300, -1, 0, 1, 255, 70_000, i64::MAX];
		let images: Vec<Vec<u8>> = values.iter().map(|v| int_image(*v, 8)).collect();
		assert!(images.windows(2).all(|w| w[0] < w[1]));
		for (v, image) in values.iter().zip(&images) {
			assert_eq!(unpack_integer(image, false), Value::Int(*v));
		}
	}

	#[test]
	fn test_integer_range() {
		let mut out = NetWriter::new();
		let err = pack_integer("c", &Value::Int(128), 1, false, &mut out).unwrap_err();
		assert_eq!(err.code(), "CODEC_003");
		assert!(pack_integer("c", &Value::Int(-1), 2, true, &mut out).is_err());
		assert!(pack_integer("c", &Value::UInt(65_536), 2, true, &mut out).is_err());
		assert!(pack_integer("c", &Value::Bytes(vec![1]), 2, true, &mut out).is_err());
	}

	#[test]
	fn test_unsigned_medium() {
		let mut out = NetWriter::new();
		pack_integer("c", &Value::UInt(0x0a0b0c), 3, true, &mut out).unwrap();
		assert_eq!(out.as_slice(), &[0x0a, 0x0b, 0x0c]);
		assert_eq!(unpack_integer(out.as_slice(), true), Value::UInt(0x0a0b0c));
	}

	#[test]
	fn test_double_zero_and_sign() {
		assert_eq!(double_image(0.0), vec![0x80, 0, 0, 0, 0, 0, 0, 0]);
		assert_eq!(double_image(-0.0), vec![0x80, 0, 0, 0, 0, 0, 0, 0]);
		assert!(double_image(-1.5) < double_image(0.0));
		assert!(double_image(f64::MIN_POSITIVE) > double_image(0.0));
	}

	#[test]
	fn test_double_order_and_restore() {
		let values = [f64::MIN, -1e100, -2.5, -f64::MIN_POSITIVE, 0.0, 1e-300, 0.5, 1.0, 3.25, 1e300, f64::MAX];
		let images: Vec<Vec<u8>> = values.iter().map(|v| double_image(*v)).collect();
		assert!(images.windows(2).all(|w| w[0] < w[1]));
		for (v, image) in values.iter().zip(&images) {
			assert_eq!(unpack_double(image), Value::Double(*v));
		}
	}

	#[test]
	fn test_float_order_and_restore() {
		let values = [f32::MIN, -7.0, -0.25, 0.0, 0.25, 7.0, f32::MAX];
		let mut images = Vec::new();
		for v in values {
			let mut out = NetWriter::new();
			pack_float("c", &Value::Float(v), &mut out).unwrap();
			assert_eq!(unpack_float(out.as_slice()), Value::Float(v));
			images.push(out.into_inner());
		}
		assert!(images.windows(2).all(|w| w[0] < w[1]));
	}

	#[test]
	fn test_nan_rejected() {
		let mut out = NetWriter::new();
		assert!(pack_double("c", &Value::Double(f64::NAN), &mut out).is_err());
	}

	#[test]
	fn test_newdate() {
		let day = 2024 * 512 + 2 * 32 + 29;
		let mut out = NetWriter::new();
		pack_newdate("c", &Value::UInt(day), &mut out).unwrap();
		assert_eq!(out.len(), 3);
		assert_eq!(unpack_newdate(out.as_slice()), Value::UInt(day));
	}
}
