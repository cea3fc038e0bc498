//! Run-length codec for snapshot memory blocks.
//!
//! The escape is a doubled marker byte: `ED ED count value` emits `value`
//! `count` times. Any other byte passes through literally. The decoder
//! only recognises the escape when the two marker bytes are adjacent in
//! the stream, so a literal `0xED` directly after a completed run is
//! plain data — the "previous byte" state is reset to a sentinel outside
//! the byte range after every run.

/// Marker byte; two in a row introduce a (count, value) run.
const MARKER: u8 = 0xED;

/// "No previous byte" sentinel, distinct from any real byte value.
const NO_PREVIOUS: u16 = 0x100;

/// Decode `source` into `destination` starting at `start`.
///
/// The first marker byte of an escape is emitted as a literal and then
/// retracted when the second arrives, so single `0xED` bytes decode
/// correctly without lookahead. Decoding consumes the whole source and
/// never writes past the destination; a truncated escape at the end of
/// the source is ignored. Returns the position after the last byte
/// written.
pub fn decode(source: &[u8], destination: &mut [u8], start: usize) -> usize {
    let mut previous = NO_PREVIOUS;
    let mut previous_written = false;
    let mut out = start;
    let mut index = 0;

    while index < source.len() {
        let current = source[index];
        if current == MARKER && previous == u16::from(MARKER) {
            let (Some(&count), Some(&value)) = (source.get(index + 1), source.get(index + 2))
            else {
                break;
            };
            // The first marker byte went out as a literal; retract it.
            if previous_written {
                out -= 1;
            }
            for _ in 0..count {
                if out < destination.len() {
                    destination[out] = value;
                    out += 1;
                }
            }
            index += 3;
            previous = NO_PREVIOUS;
            previous_written = false;
        } else {
            previous_written = out < destination.len();
            if previous_written {
                destination[out] = current;
                out += 1;
            }
            previous = u16::from(current);
            index += 1;
        }
    }

    out
}

/// Encode `source` with the inverse rules: runs of 5 or more are escaped,
/// marker runs of 2 or more are always escaped, and the byte after a lone
/// literal marker is emitted literally so the decoder cannot pair them.
#[must_use]
pub fn encode(source: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut index = 0;

    while index < source.len() {
        let byte = source[index];
        let mut run = 1usize;
        while index + run < source.len() && source[index + run] == byte {
            run += 1;
        }

        if byte == MARKER {
            if run == 1 {
                out.push(MARKER);
                index += 1;
                // The next byte (never a marker here) must stay literal.
                if index < source.len() {
                    out.push(source[index]);
                    index += 1;
                }
                continue;
            }
            push_runs(&mut out, byte, run);
        } else if run >= 5 {
            push_runs(&mut out, byte, run);
        } else {
            for _ in 0..run {
                out.push(byte);
            }
        }
        index += run;
    }

    out
}

fn push_runs(out: &mut Vec<u8>, value: u8, mut run: usize) {
    while run > 0 {
        let chunk = run.min(255);
        out.extend_from_slice(&[MARKER, MARKER, chunk as u8, value]);
        run -= chunk;
    }
}
