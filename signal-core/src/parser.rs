//! `+RCV=` telemetry frames from the LoRa module.
//!
//! The module reports every received packet as
//! `+RCV=<address>,<length>,<data>,<rssi>,<snr>\r\n`. The counting node puts
//! `LANE1:<a>,LANE2:<b>` in `<data>`, so the payload itself contains commas
//! and we never split past the second one.

use core::fmt::Write;

use crate::counts::LaneCounts;

const RCV_MARKER: &[u8] = b"+RCV=";
const LANE1_TAG: &[u8] = b"LANE1:";
const LANE2_TAG: &[u8] = b",LANE2:";

/// Longest payload `encode_payload` can produce: two `i32::MIN` renderings.
pub const PAYLOAD_CAPACITY: usize = 40;

/// The fields of one `+RCV=` report, borrowed from the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcvFrame<'a> {
    /// Sender address as sent by the module, not validated.
    pub address: &'a [u8],
    /// Declared payload length, not validated against the payload.
    pub length: &'a [u8],
    /// Everything after the second comma, trailing RSSI/SNR included.
    pub payload: &'a [u8],
}

/// Locate the first `+RCV=` marker and split out address, length and payload.
pub fn parse_rcv(frame: &[u8]) -> Option<RcvFrame<'_>> {
    let start = find(frame, RCV_MARKER)? + RCV_MARKER.len();
    let rest = &frame[start..];

    let first = rest.iter().position(|&b| b == b',')?;
    let after_first = &rest[first + 1..];
    let second = after_first.iter().position(|&b| b == b',')?;

    Some(RcvFrame {
        address: &rest[..first],
        length: &after_first[..second],
        payload: &after_first[second + 1..],
    })
}

/// Extract the lane counts from a raw frame.
///
/// Returns `None` unless the frame carries `+RCV=`, at least two commas after
/// it, and a payload starting with `LANE1:<int>,LANE2:<int>`. Whatever follows
/// the second integer is ignored. Integers are not range checked.
pub fn parse(frame: &[u8]) -> Option<LaneCounts> {
    let rcv = parse_rcv(frame)?;

    let rest = rcv.payload.strip_prefix(LANE1_TAG)?;
    let (lane_a, rest) = take_int(rest)?;
    let rest = rest.strip_prefix(LANE2_TAG)?;
    let (lane_b, _) = take_int(rest)?;

    Some(LaneCounts { lane_a, lane_b })
}

/// Render counts as the counting node sends them.
pub fn encode_payload(counts: &LaneCounts) -> heapless::String<PAYLOAD_CAPACITY> {
    let mut s = heapless::String::new();
    // Cannot overflow: PAYLOAD_CAPACITY covers two i32::MIN.
    let _ = write!(s, "LANE1:{},LANE2:{}", counts.lane_a, counts.lane_b);
    s
}

// C `isspace`: unlike `u8::is_ascii_whitespace` this includes vertical tab.
fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t'..=b'\r')
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// Same grammar as scanf's %d: leading whitespace, optional sign, digits.
fn take_int(input: &[u8]) -> Option<(i32, &[u8])> {
    let start = input
        .iter()
        .position(|&b| !is_c_space(b))
        .unwrap_or(input.len());
    let input = &input[start..];

    let sign_len = match input.first() {
        Some(b'-') | Some(b'+') => 1,
        _ => 0,
    };
    let digits = input[sign_len..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }

    let end = sign_len + digits;
    let text = core::str::from_utf8(&input[..end]).ok()?;
    let value = text.parse::<i32>().ok()?;
    Some((value, &input[end..]))
}
