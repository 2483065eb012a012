use clap::{arg,crate_version,Command};
use std::io::{BufRead,BufReader};
use std::time::Instant;

use pdtrie::dict::{Dict,Setting,STD_SETTING};
use pdtrie::pool::{BitmapPool,LabelPool,PlainPool};

const RCH: &str = "unreachable was reached";
type DYNERR = Box<dyn std::error::Error>;

/// loading aborts when the trie gets this full
const OCCUPANCY_LIMIT: f64 = 0.98;

fn main() -> Result<(),DYNERR>
{
    env_logger::init();

    let long_help =
"Examples:
---------
Load a key file and query it back:  `pdtrie -d 1 -k keys.txt -q = -n 1000000`
Load only, skip the queries:        `pdtrie -d 2 -k keys.txt -q - -n 1000000`";

    let main_cmd = Command::new("pdtrie")
        .about("Build an in-memory trie dictionary from a key file and time it")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(-d --dict <VARIANT> "label pool variant, 1=plain, 2..5=bitmap8/16/32/64")
            .value_parser(["1","2","3","4","5"])
            .required(true))
        .arg(arg!(-k --keys <PATH> "key file, one key per line").required(true))
        .arg(arg!(-q --queries <PATH> "query file, '=' reuses the key file, '-' skips querying")
            .required(true))
        .arg(arg!(-n --keycount <COUNT> "expected number of keys").required(true))
        .arg(arg!(-l --load <FACTOR> "target load factor").required(false))
        .arg(arg!(-f --fixedlen <LEN> "label chunk length, a power of 2").required(false))
        .arg(arg!(-w --width <BITS> "inline probe distance width").required(false));

    let matches = main_cmd.get_matches();

    let setting = Setting {
        num_keys: matches.get_one::<String>("keycount").expect(RCH).parse()?,
        load_factor: match matches.get_one::<String>("load") {
            Some(s) => s.parse()?,
            None => STD_SETTING.load_factor
        },
        fixed_len: match matches.get_one::<String>("fixedlen") {
            Some(s) => s.parse()?,
            None => STD_SETTING.fixed_len
        },
        width_1st: match matches.get_one::<String>("width") {
            Some(s) => s.parse()?,
            None => STD_SETTING.width_1st
        },
    };
    let key_path = matches.get_one::<String>("keys").expect(RCH);
    let query_path = matches.get_one::<String>("queries").expect(RCH);

    match matches.get_one::<String>("dict").expect(RCH).as_str() {
        "1" => bench::<PlainPool<u32>>(setting,key_path,query_path),
        "2" => bench::<BitmapPool<u32,u8>>(setting,key_path,query_path),
        "3" => bench::<BitmapPool<u32,u16>>(setting,key_path,query_path),
        "4" => bench::<BitmapPool<u32,u32>>(setting,key_path,query_path),
        "5" => bench::<BitmapPool<u32,u64>>(setting,key_path,query_path),
        _ => panic!("{}",RCH)
    }
}

fn bench<P: LabelPool<Value = u32>>(setting: Setting,key_path: &str,query_path: &str) -> Result<(),DYNERR> {
    let mut dic: Dict<P> = Dict::new(setting)?;
    run_insert(&mut dic,key_path)?;

    let query_path = match query_path {
        "=" => key_path,
        other => other
    };
    if query_path != "-" {
        let keys = read_keys(query_path)?;
        run_search(&dic,&keys);
    }

    dic.show_stat(&mut std::io::stdout())?;
    Ok(())
}

fn run_insert<P: LabelPool<Value = u32>>(dic: &mut Dict<P>,path: &str) -> Result<(),DYNERR> {
    log::debug!("loading keys from {}",path);
    let reader = BufReader::new(std::fs::File::open(path)?);
    let limit = (dic.trie().num_slots() as f64 * OCCUPANCY_LIMIT) as u64;
    let mut num_keys = 0u64;
    let sw = Instant::now();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        dic.update(line.as_bytes())?.set(1);
        num_keys += 1;
        if dic.trie().num_nodes() > limit {
            return Err(format!("trie occupancy exceeded {}",OCCUPANCY_LIMIT).into());
        }
    }

    let us = sw.elapsed().as_micros() as f64;
    println!("Bench: run_insert");
    println!(" - num_keys:\t{}",num_keys);
    println!(" - insert time:\t{:.3} us/key",us / num_keys as f64);
    Ok(())
}

fn run_search<P: LabelPool<Value = u32>>(dic: &Dict<P>,keys: &[String]) {
    log::debug!("querying {} keys",keys.len());
    let mut ok = 0u64;
    let mut ng = 0u64;
    let sw = Instant::now();

    for key in keys {
        match dic.find(key.as_bytes()) {
            Some(1) => ok += 1,
            _ => ng += 1
        }
    }

    let us = sw.elapsed().as_micros() as f64;
    println!("Bench: run_search");
    println!(" - num_keys:\t{}",keys.len());
    println!(" - ok:\t{}",ok);
    println!(" - ng:\t{}",ng);
    println!(" - search time:\t{:.3} us/key",us / keys.len() as f64);
}

fn read_keys(path: &str) -> Result<Vec<String>,DYNERR> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut keys = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        keys.push(line);
    }
    Ok(keys)
}
