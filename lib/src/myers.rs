// Copyright 2026 The Trimerge Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Myers' O(ND) edit-script search over pre-classified line sequences.
//!
//! The inputs are equivalence-class ids, one per line. The search marks
//! changed lines in per-side bitmaps; the driver in [`crate::diff`] turns
//! the bitmaps into an edit script. Without the `minimal` switch two
//! heuristics bound the cost: a best-progress shortcut that requires the
//! chosen diagonal to end in a significant snake, and a hard cutoff at
//! roughly the square root of the input size.

use crate::CancelFlag;

/// Snakes longer than this are significant: they gate the best-progress
/// heuristic and the midpoint it reports.
const SNAKE_LIMIT: i64 = 20;

/// Marks changed lines of `a` and `b` (sequences of equivalence-class ids).
///
/// `trivial` is indexed by class id and flags contents with at most two
/// non-white characters; with `discard_trivial` such lines never count as
/// matches. The bitmaps must come in zeroed and cover `a`/`b` exactly.
pub(crate) fn compute_changes(
    a: &[u32],
    b: &[u32],
    trivial: &[bool],
    discard_trivial: bool,
    minimal: bool,
    cancel: &CancelFlag,
    changed_a: &mut [bool],
    changed_b: &mut [bool],
) {
    debug_assert_eq!(a.len(), changed_a.len());
    debug_assert_eq!(b.len(), changed_b.len());

    let counts_a = class_counts(a, trivial.len());
    let counts_b = class_counts(b, trivial.len());
    let mut discards_a = mark_discards(a, &counts_b, trivial, discard_trivial);
    let mut discards_b = mark_discards(b, &counts_a, trivial, discard_trivial);
    filter_provisional_discards(&mut discards_a);
    filter_provisional_discards(&mut discards_b);
    let (xv, real_a) = apply_discards(a, &discards_a, minimal, changed_a);
    let (yv, real_b) = apply_discards(b, &discards_b, minimal, changed_b);

    let diags = xv.len() + yv.len() + 3;
    let mut too_expensive: i64 = 1;
    let mut d = diags;
    while d != 0 {
        too_expensive <<= 1;
        d >>= 2;
    }
    too_expensive = too_expensive.max(256);

    let mut search = Search {
        xv: &xv,
        yv: &yv,
        real_a: &real_a,
        real_b: &real_b,
        changed_a,
        changed_b,
        fdiag: vec![0; diags],
        bdiag: vec![0; diags],
        offset: yv.len() as i64 + 1,
        too_expensive,
        cancel,
    };
    search.compareseq(0, xv.len() as i64, 0, yv.len() as i64, minimal);

    shift_boundaries(a, changed_a, changed_b);
    shift_boundaries(b, changed_b, changed_a);
}

fn class_counts(classes: &[u32], num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; num_classes];
    for &cls in classes {
        counts[cls as usize] += 1;
    }
    counts
}

/// First discard pass: 0 keep, 1 discard, 2 provisionally discard.
///
/// A line matching nothing in the other file is discarded; a line with very
/// many matches only provisionally. Class 0 (blank under the active
/// equality) is never discarded here.
fn mark_discards(
    classes: &[u32],
    counts_other: &[usize],
    trivial: &[bool],
    discard_trivial: bool,
) -> Vec<u8> {
    let end = classes.len();
    // The "many matches" threshold grows with the square root of the size.
    let mut many = 5usize;
    let mut tem = end / 64;
    loop {
        tem >>= 2;
        if tem == 0 {
            break;
        }
        many *= 2;
    }

    let mut discards = vec![0u8; end];
    for i in 0..end {
        let cls = classes[i] as usize;
        if cls == 0 {
            continue;
        }
        if discard_trivial && trivial[cls] {
            discards[i] = 1;
            continue;
        }
        let nmatch = counts_other[cls];
        if nmatch == 0 {
            discards[i] = 1;
        } else if nmatch > many {
            discards[i] = 2;
        }
    }
    discards
}

/// Second discard pass: keep provisional discards only inside runs of
/// discardable lines whose first and last members are definite.
fn filter_provisional_discards(discards: &mut [u8]) {
    let end = discards.len();
    let mut i = 0;
    while i < end {
        if discards[i] == 2 {
            discards[i] = 0;
        } else if discards[i] != 0 {
            // Found a definite discard; measure the run it starts.
            let mut j = i;
            let mut provisional = 0usize;
            while j < end && discards[j] != 0 {
                if discards[j] == 2 {
                    provisional += 1;
                }
                j += 1;
            }
            // Cancel provisional discards at the end and shrink the run.
            while j > i && discards[j - 1] == 2 {
                j -= 1;
                discards[j] = 0;
                provisional -= 1;
            }
            let length = j - i;

            if provisional * 4 > length {
                // Mostly provisional: cancel them all.
                for k in i..j {
                    if discards[k] == 2 {
                        discards[k] = 0;
                    }
                }
            } else {
                // A subrun of `minimum` or more provisionals can stand on
                // its own; `minimum` is about the fourth root of the run.
                let mut minimum = 1usize;
                let mut tem = length >> 2;
                loop {
                    tem >>= 2;
                    if tem == 0 {
                        break;
                    }
                    minimum <<= 1;
                }
                minimum += 1;

                let mut consec = 0usize;
                let mut k: isize = 0;
                while (k as usize) < length {
                    let idx = i + k as usize;
                    if discards[idx] != 2 {
                        consec = 0;
                    } else {
                        consec += 1;
                        if minimum == consec {
                            // Back up and rescan to cancel the whole subrun.
                            k -= consec as isize;
                        } else if minimum < consec {
                            discards[idx] = 0;
                        }
                    }
                    k += 1;
                }

                // From the beginning of the run, cancel provisionals until
                // three definite keeps in a row or a definite discard at
                // least eight lines in.
                let mut consec = 0usize;
                for k in 0..length {
                    if k >= 8 && discards[i + k] == 1 {
                        break;
                    }
                    if discards[i + k] == 2 {
                        consec = 0;
                        discards[i + k] = 0;
                    } else if discards[i + k] == 0 {
                        consec = 0;
                    } else {
                        consec += 1;
                    }
                    if consec == 3 {
                        break;
                    }
                }

                i += length - 1;

                // Same thing, from the end of the run.
                let mut consec = 0usize;
                for k in 0..length {
                    if k >= 8 && discards[i - k] == 1 {
                        break;
                    }
                    if discards[i - k] == 2 {
                        consec = 0;
                        discards[i - k] = 0;
                    } else if discards[i - k] == 0 {
                        consec = 0;
                    } else {
                        consec += 1;
                    }
                    if consec == 3 {
                        break;
                    }
                }
            }
        }
        i += 1;
    }
}

/// Drops discarded lines (marking them changed) and returns the kept class
/// sequence with its mapping back to real line numbers.
fn apply_discards(
    classes: &[u32],
    discards: &[u8],
    minimal: bool,
    changed: &mut [bool],
) -> (Vec<u32>, Vec<usize>) {
    let mut kept = Vec::with_capacity(classes.len());
    let mut real = Vec::with_capacity(classes.len());
    for i in 0..classes.len() {
        if minimal || discards[i] == 0 {
            kept.push(classes[i]);
            real.push(i);
        } else {
            changed[i] = true;
        }
    }
    (kept, real)
}

struct Partition {
    xmid: i64,
    ymid: i64,
    lo_minimal: bool,
    hi_minimal: bool,
}

struct Search<'a> {
    xv: &'a [u32],
    yv: &'a [u32],
    real_a: &'a [usize],
    real_b: &'a [usize],
    changed_a: &'a mut [bool],
    changed_b: &'a mut [bool],
    fdiag: Vec<i64>,
    bdiag: Vec<i64>,
    offset: i64,
    too_expensive: i64,
    cancel: &'a CancelFlag,
}

impl Search<'_> {
    fn fd(&self, d: i64) -> i64 {
        self.fdiag[(d + self.offset) as usize]
    }

    fn set_fd(&mut self, d: i64, x: i64) {
        self.fdiag[(d + self.offset) as usize] = x;
    }

    fn bd(&self, d: i64) -> i64 {
        self.bdiag[(d + self.offset) as usize]
    }

    fn set_bd(&mut self, d: i64, x: i64) {
        self.bdiag[(d + self.offset) as usize] = x;
    }

    /// Finds the midpoint of the shortest edit script for
    /// `xv[xoff..xlim]` / `yv[yoff..ylim]` by breadth-first search from both
    /// ends along diagonals until the frontiers meet.
    ///
    /// The caller must have trimmed matching lines from both ends of the
    /// range. A heuristic midpoint can be suboptimal but never incorrect.
    fn diag(&mut self, xoff: i64, xlim: i64, yoff: i64, ylim: i64, find_minimal: bool) -> Partition {
        let dmin = xoff - ylim;
        let dmax = xlim - yoff;
        let fmid = xoff - yoff;
        let bmid = xlim - ylim;
        let mut fmin = fmid;
        let mut fmax = fmid;
        let mut bmin = bmid;
        let mut bmax = bmid;
        let odd = (fmid - bmid) & 1 != 0;

        self.set_fd(fmid, xoff);
        self.set_bd(bmid, xlim);

        let mut c: i64 = 1;
        loop {
            let mut big_snake = false;
            let cancelled = self.cancel.is_cancelled();

            // Extend the top-down search by an edit step in each diagonal.
            if fmin > dmin {
                fmin -= 1;
                self.set_fd(fmin - 1, -1);
            } else {
                fmin += 1;
            }
            if fmax < dmax {
                fmax += 1;
                self.set_fd(fmax + 1, -1);
            } else {
                fmax -= 1;
            }
            let mut d = fmax;
            while d >= fmin {
                let tlo = self.fd(d - 1);
                let thi = self.fd(d + 1);
                let mut x = if tlo >= thi { tlo + 1 } else { thi };
                let oldx = x;
                let mut y = x - d;
                while x < xlim && y < ylim && self.xv[x as usize] == self.yv[y as usize] {
                    x += 1;
                    y += 1;
                }
                if x - oldx > SNAKE_LIMIT {
                    big_snake = true;
                }
                self.set_fd(d, x);
                if odd && bmin <= d && d <= bmax && self.bd(d) <= x {
                    return Partition {
                        xmid: x,
                        ymid: y,
                        lo_minimal: true,
                        hi_minimal: true,
                    };
                }
                d -= 2;
            }

            // Similarly extend the bottom-up search.
            if bmin > dmin {
                bmin -= 1;
                self.set_bd(bmin - 1, i64::MAX);
            } else {
                bmin += 1;
            }
            if bmax < dmax {
                bmax += 1;
                self.set_bd(bmax + 1, i64::MAX);
            } else {
                bmax -= 1;
            }
            let mut d = bmax;
            while d >= bmin {
                let tlo = self.bd(d - 1);
                let thi = self.bd(d + 1);
                let mut x = if tlo < thi { tlo } else { thi - 1 };
                let oldx = x;
                let mut y = x - d;
                while x > xoff && y > yoff && self.xv[(x - 1) as usize] == self.yv[(y - 1) as usize]
                {
                    x -= 1;
                    y -= 1;
                }
                if oldx - x > SNAKE_LIMIT {
                    big_snake = true;
                }
                self.set_bd(d, x);
                if !odd && fmin <= d && d <= fmax && x <= self.fd(d) {
                    return Partition {
                        xmid: x,
                        ymid: y,
                        lo_minimal: true,
                        hi_minimal: true,
                    };
                }
                d -= 2;
            }

            if find_minimal && !cancelled {
                c += 1;
                continue;
            }

            // Heuristic: a diagonal that has made lots of progress relative
            // to the cost may be reported as the midpoint, provided it ends
            // with a significant snake.
            if c > 200 && big_snake && !cancelled {
                let mut best = 0;
                let mut part = None;
                let mut d = fmax;
                while d >= fmin {
                    let dd = d - fmid;
                    let x = self.fd(d);
                    let y = x - d;
                    let v = (x - xoff) * 2 - dd;
                    if v > 12 * (c + dd.abs())
                        && v > best
                        && xoff + SNAKE_LIMIT <= x
                        && x < xlim
                        && yoff + SNAKE_LIMIT <= y
                        && y < ylim
                    {
                        let mut k = 1;
                        while self.xv[(x - k) as usize] == self.yv[(y - k) as usize] {
                            if k == SNAKE_LIMIT {
                                best = v;
                                part = Some(Partition {
                                    xmid: x,
                                    ymid: y,
                                    lo_minimal: true,
                                    hi_minimal: false,
                                });
                                break;
                            }
                            k += 1;
                        }
                    }
                    d -= 2;
                }
                if let Some(part) = part {
                    return part;
                }

                let mut best = 0;
                let mut part = None;
                let mut d = bmax;
                while d >= bmin {
                    let dd = d - bmid;
                    let x = self.bd(d);
                    let y = x - d;
                    let v = (xlim - x) * 2 + dd;
                    if v > 12 * (c + dd.abs())
                        && v > best
                        && xoff < x
                        && x <= xlim - SNAKE_LIMIT
                        && yoff < y
                        && y <= ylim - SNAKE_LIMIT
                    {
                        let mut k = 0;
                        while self.xv[(x + k) as usize] == self.yv[(y + k) as usize] {
                            if k == SNAKE_LIMIT - 1 {
                                best = v;
                                part = Some(Partition {
                                    xmid: x,
                                    ymid: y,
                                    lo_minimal: false,
                                    hi_minimal: true,
                                });
                                break;
                            }
                            k += 1;
                        }
                    }
                    d -= 2;
                }
                if let Some(part) = part {
                    return part;
                }
            }

            // Beyond the cost bound (or asked to stop): report halfway
            // between the best frontiers found so far.
            if c >= self.too_expensive || cancelled {
                // Forward diagonal that maximizes x + y.
                let mut fxybest = -1;
                let mut fxbest = 0;
                let mut d = fmax;
                while d >= fmin {
                    let mut x = self.fd(d).min(xlim);
                    let mut y = x - d;
                    if ylim < y {
                        x = ylim + d;
                        y = ylim;
                    }
                    if fxybest < x + y {
                        fxybest = x + y;
                        fxbest = x;
                    }
                    d -= 2;
                }

                // Backward diagonal that minimizes x + y.
                let mut bxybest = i64::MAX;
                let mut bxbest = 0;
                let mut d = bmax;
                while d >= bmin {
                    let mut x = self.bd(d).max(xoff);
                    let mut y = x - d;
                    if y < yoff {
                        x = yoff + d;
                        y = yoff;
                    }
                    if x + y < bxybest {
                        bxybest = x + y;
                        bxbest = x;
                    }
                    d -= 2;
                }

                // Use the better of the two diagonals.
                return if (xlim + ylim) - bxybest < fxybest - (xoff + yoff) {
                    Partition {
                        xmid: fxbest,
                        ymid: fxybest - fxbest,
                        lo_minimal: true,
                        hi_minimal: false,
                    }
                } else {
                    Partition {
                        xmid: bxbest,
                        ymid: bxybest - bxbest,
                        lo_minimal: false,
                        hi_minimal: true,
                    }
                };
            }

            c += 1;
        }
    }

    /// Compares `xv[xoff..xlim]` with `yv[yoff..ylim]`, marking inserted or
    /// deleted lines; splits at the middle snake and recurses.
    fn compareseq(
        &mut self,
        mut xoff: i64,
        mut xlim: i64,
        mut yoff: i64,
        mut ylim: i64,
        find_minimal: bool,
    ) {
        // Slide down the bottom initial diagonal.
        while xoff < xlim
            && yoff < ylim
            && self.xv[xoff as usize] == self.yv[yoff as usize]
        {
            xoff += 1;
            yoff += 1;
        }
        // Slide up the top initial diagonal.
        while xlim > xoff
            && ylim > yoff
            && self.xv[(xlim - 1) as usize] == self.yv[(ylim - 1) as usize]
        {
            xlim -= 1;
            ylim -= 1;
        }

        if xoff == xlim {
            for y in yoff..ylim {
                self.changed_b[self.real_b[y as usize]] = true;
            }
        } else if yoff == ylim {
            for x in xoff..xlim {
                self.changed_a[self.real_a[x as usize]] = true;
            }
        } else {
            let part = self.diag(xoff, xlim, yoff, ylim, find_minimal);
            self.compareseq(xoff, part.xmid, yoff, part.ymid, part.lo_minimal);
            self.compareseq(part.xmid, xlim, part.ymid, ylim, part.hi_minimal);
        }
    }
}

/// Slides runs of changed lines forward while their trailing line matches
/// the following unchanged one, merging adjacent changes; the canonical
/// placement is the latest possible one.
fn shift_boundaries(equivs: &[u32], changed: &mut [bool], other_changed: &[bool]) {
    let i_end = changed.len() as isize;
    let get = |v: &[bool], k: isize| k >= 0 && k < v.len() as isize && v[k as usize];

    let mut i: isize = 0;
    let mut j: isize = 0;
    loop {
        // Scan forward to find the beginning of another run of changes,
        // tracking the corresponding point in the other file.
        while i < i_end && !changed[i as usize] {
            while get(other_changed, j) {
                j += 1;
            }
            j += 1;
            i += 1;
        }
        if i == i_end {
            break;
        }

        let mut start = i;
        // Find the end of this run of changes.
        i += 1;
        while get(changed, i) {
            i += 1;
        }
        while get(other_changed, j) {
            j += 1;
        }

        let mut corresponding;
        loop {
            let runlength = i - start;

            // Move the changed region back while the previous unchanged
            // line matches the last changed one, merging with previous
            // changed regions.
            while start > 0 && equivs[(start - 1) as usize] == equivs[(i - 1) as usize] {
                start -= 1;
                changed[start as usize] = true;
                i -= 1;
                changed[i as usize] = false;
                while get(changed, start - 1) {
                    start -= 1;
                }
                j -= 1;
                while get(other_changed, j) {
                    j -= 1;
                }
            }

            // Last point where the run corresponds to a changed run in the
            // other file; i_end means no such point has been found.
            corresponding = if get(other_changed, j - 1) { i } else { i_end };

            // Move the changed region forward while the first changed line
            // matches the following unchanged one, merging with following
            // changed regions.
            while i != i_end && equivs[start as usize] == equivs[i as usize] {
                changed[start as usize] = false;
                start += 1;
                changed[i as usize] = true;
                i += 1;
                while get(changed, i) {
                    i += 1;
                }
                j += 1;
                while get(other_changed, j) {
                    corresponding = i;
                    j += 1;
                }
            }

            if runlength == i - start {
                break;
            }
        }

        // If possible, move the fully-merged run back to a corresponding
        // run in the other file.
        while corresponding < i {
            start -= 1;
            changed[start as usize] = true;
            i -= 1;
            changed[i as usize] = false;
            j -= 1;
            while get(other_changed, j) {
                j -= 1;
            }
        }
    }
}
