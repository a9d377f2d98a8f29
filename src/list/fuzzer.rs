//! Randomized convergence tests.
//!
//! Three peers make random edits and sync in random pairs. After every
//! sync the pair must agree byte-for-byte, and incrementally-merged
//! branches must always match a from-scratch checkout.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::list::{ListBranch, ListOpLog};

const AGENTS: [&str; 3] = ["alice", "bob", "charlie"];

fn random_char(rng: &mut SmallRng) -> char {
    let alphabet: Vec<char> = "abcdefghijklmnop_".chars().collect();
    alphabet[rng.gen_range(0..alphabet.len())]
}

fn make_random_change(oplog: &mut ListOpLog<char>, agent_name: &str, rng: &mut SmallRng) {
    let doc = oplog.checkout_simple().unwrap();
    let agent = oplog.get_or_create_agent_id(agent_name);

    if doc.is_empty() || rng.gen_bool(0.65) {
        let pos = rng.gen_range(0..=doc.len());
        oplog.local_insert(agent, pos, random_char(rng));
    } else {
        let pos = rng.gen_range(0..doc.len());
        let len = rng.gen_range(1..=usize::min(3, doc.len() - pos));
        oplog.local_delete(agent, pos, len).unwrap();
    }
}

#[test]
fn convergence_fuzzer() {
    for seed in 0..30 {
        let mut rng = SmallRng::seed_from_u64(seed);

        let mut oplogs: Vec<ListOpLog<char>> = (0..3).map(|_| ListOpLog::new()).collect();
        let mut branches: Vec<ListBranch<char>> = (0..3).map(|_| ListBranch::new()).collect();

        for _i in 0..40 {
            // Someone edits.
            let idx = rng.gen_range(0..oplogs.len());
            make_random_change(&mut oplogs[idx], AGENTS[idx], &mut rng);

            // Catch the peer's branch up incrementally; it must agree with
            // a full checkout.
            branches[idx].merge_from(&oplogs[idx], None).unwrap();
            assert_eq!(branches[idx].content, oplogs[idx].checkout_simple().unwrap(),
                       "branch diverged from checkout (seed {seed})");

            // Sometimes a random pair syncs.
            if rng.gen_bool(0.3) {
                let x = rng.gen_range(0..oplogs.len());
                let mut y = rng.gen_range(0..oplogs.len() - 1);
                if y >= x { y += 1; }

                let x_log = oplogs[x].clone();
                let y_log = oplogs[y].clone();
                oplogs[x].merge_from(&y_log).unwrap();
                oplogs[y].merge_from(&x_log).unwrap();

                assert_eq!(oplogs[x].checkout_simple().unwrap(),
                           oplogs[y].checkout_simple().unwrap(),
                           "peers diverged after sync (seed {seed})");

                branches[x].merge_from(&oplogs[x], None).unwrap();
                assert_eq!(branches[x].content, oplogs[x].checkout_simple().unwrap(),
                           "branch diverged after sync (seed {seed})");
            }
        }

        // Full mesh sync at the end. Everyone must converge.
        for x in 0..oplogs.len() {
            for y in 0..oplogs.len() {
                if x == y { continue; }
                let src = oplogs[y].clone();
                oplogs[x].merge_from(&src).unwrap();
            }
        }

        let expect = oplogs[0].checkout_simple().unwrap();
        for (i, oplog) in oplogs.iter().enumerate() {
            oplog.dbg_check(true);
            assert_eq!(oplog.checkout_simple().unwrap(), expect,
                       "peer {i} diverged (seed {seed})");
        }

        for (branch, oplog) in branches.iter_mut().zip(oplogs.iter()) {
            branch.merge_from(oplog, None).unwrap();
            assert_eq!(branch.content, expect, "final branch diverged (seed {seed})");
        }
    }
}

#[test]
fn wire_sync_equals_direct_merge() {
    // Serializing a diff and replaying it must give the same graph as
    // merge_from.
    for seed in 0..10 {
        let mut rng = SmallRng::seed_from_u64(seed + 1000);

        let mut a: ListOpLog<char> = ListOpLog::new();
        let mut b: ListOpLog<char> = ListOpLog::new();

        for _i in 0..30 {
            if rng.gen_bool(0.5) {
                make_random_change(&mut a, "alice", &mut rng);
            } else {
                make_random_change(&mut b, "bob", &mut rng);
            }
        }

        a.merge_from(&b).unwrap();
        b.merge_from(&a).unwrap();

        assert_eq!(a.cg, b.cg);
        assert_eq!(a.checkout_simple().unwrap(), b.checkout_simple().unwrap());

        // Round-trip the whole graph through the wire format.
        let entries = a.cg.serialize_everything().unwrap();
        let mut cg2 = crate::CausalGraph::new();
        cg2.merge_partial_versions(&entries).unwrap();
        assert_eq!(a.cg, cg2);
    }
}
