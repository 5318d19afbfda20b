use cdt_core::RngHandle;
use cdt_foliation::Manifold3;
use cdt_mcmc::{apply_move, check_move, Move, MoveOutcome};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_move_sequences_keep_the_foliation(
        universe_seed in any::<u64>(),
        move_seed in any::<u64>(),
        picks in prop::collection::vec(0usize..5, 1..24),
    ) {
        let mut rng = RngHandle::from_seed(universe_seed);
        let mut manifold = Manifold3::new(48, 3, &mut rng).unwrap();
        let mut rng = RngHandle::from_seed(move_seed);
        for pick in picks {
            let mv = Move::ALL[pick];
            let before = *manifold.geometry();
            match apply_move(&mut manifold, mv, &mut rng) {
                Ok(MoveOutcome::Applied) => {
                    prop_assert!(check_move(&before, manifold.geometry(), mv));
                }
                Ok(MoveOutcome::Inapplicable { .. }) | Err(_) => {
                    prop_assert_eq!(*manifold.geometry(), before);
                }
            }
            prop_assert!(manifold.is_correct());
            prop_assert_eq!(manifold.min_time(), 1);
            prop_assert_eq!(manifold.max_time(), 3);
        }
    }
}
