use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

// Magics borrowed from Shallow Blue by GunshipPenguin
// (https://github.com/GunshipPenguin/shallow-blue/blob/c6d7e9615514a86533a9e0ffddfc96e058fc9cfd/src/attacks.h#L120)
const ROOK_MAGICS: [u64; 64] = [
    0xa8002c000108020, 0x6c00049b0002001, 0x100200010090040, 0x2480041000800801, 0x280028004000800,
    0x900410008040022, 0x280020001001080, 0x2880002041000080, 0xa000800080400034, 0x4808020004000,
    0x2290802004801000, 0x411000d00100020, 0x402800800040080, 0xb000401004208, 0x2409000100040200,
    0x1002100004082, 0x22878001e24000, 0x1090810021004010, 0x801030040200012, 0x500808008001000,
    0xa08018014000880, 0x8000808004000200, 0x201008080010200, 0x801020000441091, 0x800080204005,
    0x1040200040100048, 0x120200402082, 0xd14880480100080, 0x12040280080080, 0x100040080020080,
    0x9020010080800200, 0x813241200148449, 0x491604001800080, 0x100401000402001, 0x4820010021001040,
    0x400402202000812, 0x209009005000802, 0x810800601800400, 0x4301083214000150, 0x204026458e001401,
    0x40204000808000, 0x8001008040010020, 0x8410820820420010, 0x1003001000090020, 0x804040008008080,
    0x12000810020004, 0x1000100200040208, 0x430000a044020001, 0x280009023410300, 0xe0100040002240,
    0x200100401700, 0x2244100408008080, 0x8000400801980, 0x2000810040200, 0x8010100228810400,
    0x2000009044210200, 0x4080008040102101, 0x40002080411d01, 0x2005524060000901, 0x502001008400422,
    0x489a000810200402, 0x1004400080a13, 0x4000011008020084, 0x26002114058042,
];
const ROOK_INDEX_BITS: [usize; 64] = [
    12, 11, 11, 11, 11, 11, 11, 12,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    11, 10, 10, 10, 10, 10, 10, 11,
    12, 11, 11, 11, 11, 11, 11, 12,
];
const BISHOP_MAGICS: [u64; 64] = [
    0x89a1121896040240, 0x2004844802002010, 0x2068080051921000, 0x62880a0220200808, 0x4042004000000,
    0x100822020200011, 0xc00444222012000a, 0x28808801216001, 0x400492088408100, 0x201c401040c0084,
    0x840800910a0010, 0x82080240060, 0x2000840504006000, 0x30010c4108405004, 0x1008005410080802,
    0x8144042209100900, 0x208081020014400, 0x4800201208ca00, 0xf18140408012008, 0x1004002802102001,
    0x841000820080811, 0x40200200a42008, 0x800054042000, 0x88010400410c9000, 0x520040470104290,
    0x1004040051500081, 0x2002081833080021, 0x400c00c010142, 0x941408200c002000, 0x658810000806011,
    0x188071040440a00, 0x4800404002011c00, 0x104442040404200, 0x511080202091021, 0x4022401120400,
    0x80c0040400080120, 0x8040010040820802, 0x480810700020090, 0x102008e00040242, 0x809005202050100,
    0x8002024220104080, 0x431008804142000, 0x19001802081400, 0x200014208040080, 0x3308082008200100,
    0x41010500040c020, 0x4012020c04210308, 0x208220a202004080, 0x111040120082000, 0x6803040141280a00,
    0x2101004202410000, 0x8200000041108022, 0x21082088000, 0x2410204010040, 0x40100400809000,
    0x822088220820214, 0x40808090012004, 0x910224040218c9, 0x402814422015008, 0x90014004842410,
    0x1000042304105, 0x10008830412a00, 0x2520081090008908, 0x40102000a0a60140,
];
const BISHOP_INDEX_BITS: [usize; 64] = [
    6, 5, 5, 5, 5, 5, 5, 6,
    5, 5, 5, 5, 5, 5, 5, 5,
    5, 5, 7, 7, 7, 7, 5, 5,
    5, 5, 7, 9, 9, 7, 5, 5,
    5, 5, 7, 9, 9, 7, 5, 5,
    5, 5, 7, 7, 7, 7, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5,
    6, 5, 5, 5, 5, 5, 5, 6,
];

const A_FILE: u64 = 0x0101010101010101;
const H_FILE: u64 = 0x8080808080808080;
const RANK_1: u64 = 0xff;
const RANK_8: u64 = 0xff00000000000000;

// Same direction order as the runtime rays: even indices walk towards higher squares.
fn step(direction: usize, b: u64) -> u64 {
    match direction {
        0 => (b << 1) & !A_FILE,
        1 => (b >> 1) & !H_FILE,
        2 => b << 8,
        3 => b >> 8,
        4 => (b << 7) & !H_FILE,
        5 => (b >> 7) & !A_FILE,
        6 => (b << 9) & !A_FILE,
        _ => (b >> 9) & !H_FILE,
    }
}
// Edge squares that never matter as blockers, per direction
const EDGES: [u64; 8] = [
    H_FILE,
    A_FILE,
    RANK_8,
    RANK_1,
    A_FILE | RANK_8,
    H_FILE | RANK_1,
    H_FILE | RANK_8,
    A_FILE | RANK_1,
];

fn main() -> io::Result<()> {
    let out_dir = env::var_os("OUT_DIR").expect("cargo always sets OUT_DIR for build scripts");
    let tables = Tables::compute();

    let mut lookup = BufWriter::new(File::create(Path::new(&out_dir).join("lookup.rs"))?);
    writeln!(lookup, "impl SquareSet {{")?;
    write_table(&mut lookup, "pub const KING_STEPS: [SquareSet; 64]", &tables.king_steps, Some("SquareSet"))?;
    write_table(&mut lookup, "pub const KNIGHT_ATTACKS: [SquareSet; 64]", &tables.knight_attacks, Some("SquareSet"))?;
    write_table(&mut lookup, "const BISHOP_MAGICS: [u64; 64]", &BISHOP_MAGICS, None)?;
    write_table(&mut lookup, "const BISHOP_INDEX_BITS: [usize; 64]", &BISHOP_INDEX_BITS, None)?;
    write_table(&mut lookup, "const BISHOP_MASKS: [SquareSet; 64]", &tables.bishop_masks, Some("SquareSet"))?;
    write_table(&mut lookup, "const ROOK_MAGICS: [u64; 64]", &ROOK_MAGICS, None)?;
    write_table(&mut lookup, "const ROOK_INDEX_BITS: [usize; 64]", &ROOK_INDEX_BITS, None)?;
    write_table(&mut lookup, "const ROOK_MASKS: [SquareSet; 64]", &tables.rook_masks, Some("SquareSet"))?;
    write_grid(&mut lookup, "const BETWEEN: [[SquareSet; 64]; 64]", &tables.between, Some("SquareSet"))?;
    write_grid(&mut lookup, "const BISHOP_ATTACKS: [[SquareSet; 512]; 64]", &tables.bishop_attacks, Some("SquareSet"))?;
    write_grid(&mut lookup, "const ROOK_ATTACKS: [[SquareSet; 4096]; 64]", &tables.rook_attacks, Some("SquareSet"))?;
    writeln!(lookup, "}}")?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}

fn write_table<T: ToString>(out: &mut impl Write, declaration: &str, values: &[T], wrapper: Option<&str>) -> io::Result<()> {
    write!(out, "{} = [", declaration)?;
    for value in values {
        match wrapper {
            Some(w) => write!(out, "{}({}), ", w, value.to_string())?,
            None => write!(out, "{}, ", value.to_string())?,
        }
    }
    writeln!(out, "];")
}

fn write_grid<T: ToString>(out: &mut impl Write, declaration: &str, rows: &[Vec<T>], wrapper: Option<&str>) -> io::Result<()> {
    writeln!(out, "{} = [", declaration)?;
    for row in rows {
        write!(out, "[")?;
        for value in row {
            match wrapper {
                Some(w) => write!(out, "{}({}), ", w, value.to_string())?,
                None => write!(out, "{}, ", value.to_string())?,
            }
        }
        writeln!(out, "],")?;
    }
    writeln!(out, "];")
}

struct Tables {
    king_steps: Vec<u64>,
    knight_attacks: Vec<u64>,
    between: Vec<Vec<u64>>,
    bishop_masks: Vec<u64>,
    bishop_attacks: Vec<Vec<u64>>,
    rook_masks: Vec<u64>,
    rook_attacks: Vec<Vec<u64>>,
}

impl Tables {
    fn compute() -> Tables {
        let rays = rays();
        let bishop_masks = slider_masks(&rays, 4..8);
        let rook_masks = slider_masks(&rays, 0..4);
        Tables {
            king_steps: (0..64).map(|sq| (0..8).fold(0, |acc, d| acc | step(d, 1u64 << sq))).collect(),
            knight_attacks: (0..64).map(knight_attacks).collect(),
            between: between(&rays),
            bishop_attacks: slider_table(&rays, 4..8, &bishop_masks, &BISHOP_MAGICS, &BISHOP_INDEX_BITS, 512),
            rook_attacks: slider_table(&rays, 0..4, &rook_masks, &ROOK_MAGICS, &ROOK_INDEX_BITS, 4096),
            bishop_masks,
            rook_masks,
        }
    }
}

fn knight_attacks(sq: usize) -> u64 {
    let origin = 1u64 << sq;
    let one_file = ((origin << 1) & !A_FILE) | ((origin >> 1) & !H_FILE);
    let two_files = ((origin << 2) & !(A_FILE | A_FILE << 1)) | ((origin >> 2) & !(H_FILE | H_FILE >> 1));
    (one_file << 16) | (one_file >> 16) | (two_files << 8) | (two_files >> 8)
}

fn rays() -> [[u64; 64]; 8] {
    let mut rays = [[0u64; 64]; 8];
    for (direction, direction_rays) in rays.iter_mut().enumerate() {
        for (sq, ray) in direction_rays.iter_mut().enumerate() {
            let mut current = step(direction, 1u64 << sq);
            while current != 0 {
                *ray |= current;
                current = step(direction, current);
            }
        }
    }
    rays
}

// Squares strictly between two aligned squares, plus the far end
fn between(rays: &[[u64; 64]; 8]) -> Vec<Vec<u64>> {
    (0..64)
        .map(|origin| {
            (0..64)
                .map(|target| {
                    rays.iter()
                        .find(|ray| ray[origin] & (1u64 << target) != 0)
                        .map_or(0, |ray| ray[origin] & !ray[target])
                })
                .collect()
        })
        .collect()
}

fn slider_masks(rays: &[[u64; 64]; 8], directions: std::ops::Range<usize>) -> Vec<u64> {
    (0..64)
        .map(|sq| directions.clone().fold(0, |mask, d| mask | (rays[d][sq] & !EDGES[d])))
        .collect()
}

fn slider_table(
    rays: &[[u64; 64]; 8],
    directions: std::ops::Range<usize>,
    masks: &[u64],
    magics: &[u64; 64],
    bits: &[usize; 64],
    width: usize,
) -> Vec<Vec<u64>> {
    (0..64)
        .map(|sq| {
            let mut row = vec![0u64; width];
            for index in 0..(1usize << bits[sq]) {
                let blockers = blockers_by_index(index, masks[sq]);
                let key = blockers.wrapping_mul(magics[sq]) >> (64 - bits[sq]);
                row[key as usize] = slow_slider_attacks(rays, directions.clone(), sq, blockers);
            }
            row
        })
        .collect()
}

fn blockers_by_index(index: usize, mask: u64) -> u64 {
    let mut blockers = 0u64;
    let mut remaining = mask;
    let mut bit = 0;
    while remaining != 0 {
        let lsb = remaining.trailing_zeros();
        if index & (1 << bit) != 0 {
            blockers |= 1u64 << lsb;
        }
        remaining &= remaining - 1;
        bit += 1;
    }
    blockers
}

fn slow_slider_attacks(rays: &[[u64; 64]; 8], directions: std::ops::Range<usize>, origin: usize, blockers: u64) -> u64 {
    let mut attacks = 0u64;
    for direction in directions {
        let ray = rays[direction][origin];
        let blocked_by = blockers & ray;
        if blocked_by == 0 {
            attacks |= ray;
            continue;
        }
        let first_blocker = if direction % 2 == 0 {
            blocked_by.trailing_zeros() as usize
        } else {
            63 - blocked_by.leading_zeros() as usize
        };
        attacks |= ray & !rays[direction][first_blocker];
    }
    attacks
}
